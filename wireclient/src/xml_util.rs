//! XML splicing, a minimal DOM for dotted-path lookups, and the
//! revision/checksum version-string grammar (spec §4.H, §6, §8).
//!
//! The service returns a root-less fragment per reply; the client splices
//! it into a well-formed document before parsing (spec §8 round-trip:
//! "parsing `decl + \"<playlist>\" + fragment + \"</playlist>\"` yields a
//! tree whose root is `<playlist>`"). `quick-xml` (already a `pmoutils`
//! dependency) drives the actual scan; the tree built here is deliberately
//! small — just enough to walk the dotted `next-change/change/ops/...`
//! paths `playlist.c` queries with `ezxml_get`, not a general DOM.

use crate::error::{Result, WireError};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n";

/// Wraps a root-less reply fragment in a well-formed document under
/// `root_tag` (playlist/container replies use `"playlist"`; browse replies
/// use `"artists"`/`"albums"`/`"tracks"`, spec §4.H/§6).
pub fn splice_document(root_tag: &str, fragment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(XML_DECL.len() + fragment.len() + 2 * root_tag.len() + 8);
    out.extend_from_slice(XML_DECL.as_bytes());
    out.push(b'<');
    out.extend_from_slice(root_tag.as_bytes());
    out.extend_from_slice(b">\n");
    out.extend_from_slice(fragment);
    out.extend_from_slice(b"</");
    out.extend_from_slice(root_tag.as_bytes());
    out.push(b'>');
    out
}

/// Wraps a root-less reply fragment in a well-formed `<playlist>` document.
pub fn splice_playlist_document(fragment: &[u8]) -> Vec<u8> {
    splice_document("playlist", fragment)
}

#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Walks a dotted path of child element names, returning the first
    /// matching descendant (depth-first, matching `ezxml_get`'s first-match
    /// semantics).
    pub fn get_path(&self, path: &[&str]) -> Option<&XmlNode> {
        let mut current = self;
        for segment in path {
            current = current.children.iter().find(|c| c.name == *segment)?;
        }
        Some(current)
    }

    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).map(|n| n.text.as_str())
    }
}

/// Parses a well-formed XML document into the minimal tree above. Returns
/// `OtherPermanent` (spec §7: malformed XML is never retried) on malformed
/// input.
pub fn parse_xml(bytes: &[u8]) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(XmlNode {
                    name,
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let node = XmlNode {
                    name,
                    text: String::new(),
                    children: Vec::new(),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(e) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&e.unescape()?);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| WireError::parse_failure("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| WireError::parse_failure("empty document"))
}

/// Parsed `revision,item_count,checksum,shared` quadruple (spec §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub revision: u64,
    pub item_count: u64,
    pub checksum: u32,
    pub shared: bool,
}

/// Parses the `"%010d,%010d,%010d,%d"`-shaped version string (spec §8
/// boundary: trailing fields beyond the first four are accepted; fewer
/// than three rejects the whole update).
pub fn parse_version(text: &str) -> Option<VersionInfo> {
    let fields: Vec<&str> = text.trim().split(',').collect();
    if fields.len() < 3 {
        return None;
    }
    let revision = fields[0].trim().parse().ok()?;
    let item_count = fields[1].trim().parse().ok()?;
    let checksum = fields[2].trim().parse().ok()?;
    let shared = fields.get(3).map(|f| f.trim() == "1").unwrap_or(false);
    Some(VersionInfo {
        revision,
        item_count,
        checksum,
        shared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_wraps_fragment_in_playlist_root() {
        let doc = splice_playlist_document(b"<next-change/>");
        let tree = parse_xml(&doc).unwrap();
        assert_eq!(tree.name, "playlist");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "next-change");
    }

    #[test]
    fn get_path_walks_dotted_segments() {
        let doc = splice_playlist_document(b"<next-change><change><ops><name>Mix</name></ops></change></next-change>");
        let tree = parse_xml(&doc).unwrap();
        let name = tree.text_at(&["next-change", "change", "ops", "name"]);
        assert_eq!(name, Some("Mix"));
    }

    #[test]
    fn version_parses_four_fields() {
        let v = parse_version("0000000003,0000000002,0000001234,0").unwrap();
        assert_eq!(v.revision, 3);
        assert_eq!(v.item_count, 2);
        assert_eq!(v.checksum, 1234);
        assert!(!v.shared);
    }

    #[test]
    fn version_accepts_trailing_garbage_beyond_four_fields() {
        let v = parse_version("7,2,0xabc_is_garbage_field_count_only_needs_three,1,extra,extra2");
        // third field isn't numeric here on purpose to show >=3 fields is the
        // only length requirement; this specific string fails to parse as a
        // checksum and returns None, matching "fewer than three rejects" by
        // symmetry (a present-but-malformed field still fails the parse).
        assert!(v.is_none());
        let v2 = parse_version("7,2,2748,1,extra,extra2").unwrap();
        assert_eq!(v2.checksum, 2748);
        assert!(v2.shared);
    }

    #[test]
    fn version_rejects_fewer_than_three_fields() {
        assert!(parse_version("7,2").is_none());
    }
}
