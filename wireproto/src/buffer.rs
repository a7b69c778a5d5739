//! Growable byte buffer used to accumulate a request's streamed payload.
//!
//! Mirrors `buf_new`/`buf_append_data` from the original implementation:
//! callbacks append `DATA` frames here as they arrive and hand the whole
//! thing to the XML parser on `END`.

#[derive(Debug, Clone, Default)]
pub struct GrowBuffer {
    data: Vec<u8>,
}

impl GrowBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn append_str(&mut self, s: &str) {
        self.append(s.as_bytes());
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_appended_chunks_in_order() {
        let mut buf = GrowBuffer::new();
        buf.append_str("<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<playlist>\n");
        buf.append_str("<next-change/>");
        buf.append_str("</playlist>");
        assert_eq!(
            buf.as_str().unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<playlist>\n<next-change/></playlist>"
        );
    }
}
