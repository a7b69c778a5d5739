//! Adler-32, used for playlist and container checksums (spec invariants 4-5).
//!
//! Implemented from scratch rather than pulled from a crate: the algorithm's
//! exact accumulation order is part of the tested surface (it must match the
//! service), not an implementation detail we're free to delegate.

const MOD_ADLER: u32 = 65521;

/// Running Adler-32 state, initialized to 1 per spec.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        for &byte in data {
            self.a = (self.a + byte as u32) % MOD_ADLER;
            self.b = (self.b + self.a) % MOD_ADLER;
        }
        self
    }

    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience one-shot helper: `adler32(seed_state_bytes_already_applied)`.
pub fn adler32(chunks: impl IntoIterator<Item = impl AsRef<[u8]>>) -> u32 {
    let mut state = Adler32::new();
    for chunk in chunks {
        state.update(chunk.as_ref());
    }
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_one() {
        assert_eq!(Adler32::new().finish(), 1);
    }

    #[test]
    fn matches_known_vector() {
        // "Wikipedia" -> 0x11E60398 is the canonical Adler-32 test vector.
        let mut state = Adler32::new();
        state.update(b"Wikipedia");
        assert_eq!(state.finish(), 0x11E60398);
    }

    #[test]
    fn incremental_updates_match_single_update() {
        let mut incremental = Adler32::new();
        incremental.update(b"foo").update(b"bar");

        let mut single = Adler32::new();
        single.update(b"foobar");

        assert_eq!(incremental.finish(), single.finish());
    }
}
