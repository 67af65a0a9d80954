//! Byte-range editing of MSBuild XML
//!
//! Elements are located by parsing with `roxmltree`; the edit itself is a
//! splice of the original text so comments, whitespace and attribute order
//! survive untouched.

use crate::error::ManifestError;
use roxmltree::{Document, Node};
use std::ops::Range;
use std::path::Path;

/// Element names that declare a package version
pub const PACKAGE_ELEMENTS: &[&str] = &[
    "PackageReference",
    "PackageVersion",
    "GlobalPackageReference",
];

const BOM: char = '\u{feff}';

/// Length of a leading byte order mark, if any
fn bom_len(content: &str) -> usize {
    if content.starts_with(BOM) {
        BOM.len_utf8()
    } else {
        0
    }
}

/// Parse `content` (minus any BOM) and hand the document to `f`
pub fn with_document<T, F>(content: &str, path: &Path, f: F) -> Result<T, ManifestError>
where
    F: FnOnce(&Document<'_>) -> Result<T, ManifestError>,
{
    let body = &content[bom_len(content)..];
    let doc = Document::parse(body)
        .map_err(|e| ManifestError::xml_parse_error(path, e.to_string()))?;
    f(&doc)
}

/// A pending replacement, in coordinates of the BOM-less document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Splice {
    /// Apply to the original content, BOM included
    pub fn apply(&self, content: &str) -> String {
        let offset = bom_len(content);
        let start = self.range.start + offset;
        let end = self.range.end + offset;
        let mut out = String::with_capacity(content.len() + self.replacement.len());
        out.push_str(&content[..start]);
        out.push_str(&self.replacement);
        out.push_str(&content[end..]);
        out
    }
}

/// Returns true if `node` is an element with the local name `name` (case-insensitive)
pub fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

/// The element name if `node` is one of the package declaring elements
pub fn package_element_name(node: &Node<'_, '_>) -> Option<&'static str> {
    PACKAGE_ELEMENTS
        .iter()
        .find(|name| is_element(node, name))
        .copied()
}

/// Read an attribute by name, ignoring case
pub fn attribute<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

/// The package id of a package element (`Include`, else `Update`)
pub fn package_identity<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    attribute(node, "Include").or_else(|| attribute(node, "Update"))
}

/// Byte range of the element's start tag, `<` through `>`
fn start_tag(text: &str, node: &Node<'_, '_>) -> Range<usize> {
    let range = node.range();
    let mut quote: Option<u8> = None;
    for (i, byte) in text.as_bytes()[range.clone()].iter().enumerate() {
        match (quote, *byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*byte),
            (None, b'>') => return range.start..range.start + i + 1,
            _ => {}
        }
    }
    range
}

/// Replace the value of the `Version` attribute of `node`
pub fn version_attribute_splice(node: &Node<'_, '_>, new_version: &str) -> Option<Splice> {
    let attr = node
        .attributes()
        .find(|a| a.namespace().is_none() && a.name().eq_ignore_ascii_case("Version"))?;
    Some(Splice {
        range: attr.range_value(),
        replacement: new_version.to_string(),
    })
}

/// Replace the text content of a property element such as `<FooVersion>1.0</FooVersion>`.
/// `text` must be the text the document was parsed from.
pub fn element_text_splice(text: &str, node: &Node<'_, '_>, new_text: &str) -> Splice {
    if let Some(child) = node.children().find(|c| c.is_text()) {
        return Splice {
            range: child.range(),
            replacement: new_text.to_string(),
        };
    }

    let tag = start_tag(text, node);
    if text[tag.clone()].ends_with("/>") {
        // Self-closing: rewrite as an element with content
        let name = node.tag_name().name();
        return Splice {
            range: node.range(),
            replacement: format!("<{}>{}</{}>", name, new_text, name),
        };
    }
    Splice {
        range: tag.end..tag.end,
        replacement: new_text.to_string(),
    }
}

/// Body text of `content` as seen by the parser
pub fn body(content: &str) -> &str {
    &content[bom_len(content)..]
}
