//! Component H: the `Document` facade — a single eager pass over a
//! revision-store file, collated into the queryable shapes consumers want.

use crate::error::Result;
use crate::file_node::FileNodeBody;
use crate::file_node_list::{FileNode, FileNodeList, ParseState};
use crate::gidt::GlobalIdTable;
use crate::guid::CompactId;
use crate::header::Header;
use crate::jcid::Jcid;
use crate::reader::Reader;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::sync::OnceLock;

/// One decoded object's property set, rendered for consumption (§4.L).
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub jcid: Jcid,
    pub jcid_name: String,
    pub oid: String,
    pub properties: IndexMap<String, String>,
}

/// An embedded file recovered from the FileDataStore, merged with whatever
/// declaration metadata pointed at it.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub content: Option<Vec<u8>>,
    pub extension: Option<String>,
    pub oid: Option<String>,
}

/// A URL found either in a `WzHyperlinkUrl` property or embedded in
/// `RichEditTextUnicode` text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkEntry {
    pub oid: String,
    pub url: String,
}

/// A fully parsed revision-store file.
pub struct Document {
    header: Header,
    gidt: GlobalIdTable,
    properties: Vec<PropertyRecord>,
    files: HashMap<String, FileEntry>,
    links: Vec<LinkEntry>,
}

impl Document {
    /// Parse `reader` in a single pass: header, then the root FileNodeList
    /// tree, building the Global Identification Table and collecting every
    /// property set, file, and link along the way.
    pub fn open<R>(reader: R) -> Result<Self>
    where
        R: Read + Seek,
    {
        let mut r = Reader::new(reader);
        let header = Header::read(&mut r)?;

        let mut state = ParseState::new();
        let root = FileNodeList::read(&mut r, header.fcr_file_node_list_root, &mut state)?;

        let mut properties = Vec::new();
        let mut files = HashMap::new();
        let mut links = Vec::new();
        for fragment in &root.fragments {
            for node in &fragment.nodes {
                collect(node, &state.gidt, &mut properties, &mut files, &mut links);
            }
        }
        dedup_links(&mut links);

        Ok(Self {
            header,
            gidt: state.gidt,
            properties,
            files,
            links,
        })
    }

    pub fn header_summary(&self) -> IndexMap<String, String> {
        self.header.header_summary()
    }

    pub fn is_toc(&self) -> bool {
        self.header.is_toc()
    }

    pub fn properties(&self) -> &[PropertyRecord] {
        &self.properties
    }

    pub fn files(&self) -> &HashMap<String, FileEntry> {
        &self.files
    }

    pub fn links(&self) -> &[LinkEntry] {
        &self.links
    }
}

fn collect(
    node: &FileNode,
    gidt: &GlobalIdTable,
    properties: &mut Vec<PropertyRecord>,
    files: &mut HashMap<String, FileEntry>,
    links: &mut Vec<LinkEntry>,
) {
    match &node.body {
        FileNodeBody::ObjectDeclaration2RefCountFnd { body, .. } => {
            if let Some(prop_set) = &node.property_set {
                let oid = render_compact_id(&body.oid, gidt);
                let rendered = prop_set.body.get_properties(gidt);

                if let Some(url) = rendered.get("WzHyperlinkUrl") {
                    push_trimmed_link(links, &oid, url);
                }
                if let Some(text) = rendered.get("RichEditTextUnicode") {
                    for url in extract_urls(text) {
                        links.push(LinkEntry {
                            oid: oid.clone(),
                            url,
                        });
                    }
                }

                properties.push(PropertyRecord {
                    jcid: body.jcid,
                    jcid_name: body.jcid.name().to_string(),
                    oid,
                    properties: rendered,
                });
            }
        }
        FileNodeBody::FileDataStoreObjectReferenceFnd {
            guid_reference,
            file_data,
            ..
        } => {
            let key = guid_reference.hyphenated().to_string();
            let entry = files.entry(key).or_default();
            entry.content = Some(file_data.clone());
        }
        FileNodeBody::ObjectDeclarationFileData3RefCountFnd {
            oid,
            file_data_reference,
            extension,
            ..
        } => {
            if let Some(key) = strip_ifndf_reference(file_data_reference) {
                let entry = files.entry(key).or_default();
                entry.extension = Some(extension.clone());
                entry.oid = Some(render_compact_id(oid, gidt));
            }
        }
        _ => {}
    }

    for child_fragment in &node.children {
        for child in &child_fragment.nodes {
            collect(child, gidt, properties, files, links);
        }
    }
}

/// Drop repeat `(oid, url)` pairs while keeping first-seen order, matching
/// the original renderer's identity-plus-url dedup key.
fn dedup_links(links: &mut Vec<LinkEntry>) {
    let mut seen = HashSet::new();
    links.retain(|link| seen.insert((link.oid.clone(), link.url.clone())));
}

fn render_compact_id(id: &CompactId, gidt: &GlobalIdTable) -> String {
    match gidt.resolve(id) {
        Some(guid) => format!("{{{guid}}}, {}", id.n),
        None => "<missing>".to_string(),
    }
}

/// `<ifndf>{GUID}` (case-insensitive marker, braces kept) -> lowercase GUID
/// string with no braces, matching the storage-side key used for
/// `FileDataStoreObjectReferenceFND.guidReference`.
fn strip_ifndf_reference(reference: &str) -> Option<String> {
    let trimmed = reference
        .strip_prefix("<ifndf>{")
        .unwrap_or(reference)
        .trim_end_matches('}');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

fn push_trimmed_link(links: &mut Vec<LinkEntry>, oid: &str, raw: &str) {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if !trimmed.is_empty() {
        links.push(LinkEntry {
            oid: oid.to_string(),
            url: trimmed.to_string(),
        });
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?:https?://|mailto:|onenote:)[^\s<>"']+"#).expect("static regex")
    })
}

/// Pull every URL out of free-form text, right-trimming trailing
/// punctuation a sentence would carry but a URL wouldn't.
fn extract_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| ")].,;:!?\"'、。".contains(c))
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ifndf_reference_and_lowercases() {
        let guid = uuid::Uuid::new_v4().to_string().to_uppercase();
        let reference = format!("<ifndf>{{{guid}}}");
        let stripped = strip_ifndf_reference(&reference).unwrap();
        assert_eq!(stripped, guid.to_lowercase());
    }

    #[test]
    fn extract_urls_trims_trailing_punctuation() {
        let text = "see https://example.com/page, and also (onenote:foo/bar).";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["https://example.com/page", "onenote:foo/bar"]);
    }

    #[test]
    fn extract_urls_finds_mailto() {
        let text = "contact mailto:user@example.com!";
        let urls = extract_urls(text);
        assert_eq!(urls, vec!["mailto:user@example.com"]);
    }

    #[test]
    fn push_trimmed_link_drops_nul_and_empty() {
        let mut links = Vec::new();
        push_trimmed_link(&mut links, "oid", "\0\0\0");
        assert!(links.is_empty());
        push_trimmed_link(&mut links, "oid", "https://example.com\0 ");
        assert_eq!(links[0].url, "https://example.com");
    }
}
