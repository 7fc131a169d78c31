//! XML text helpers shared by the package, template, and document readers.

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesRef, BytesStart, BytesText};

use crate::opc::error::{OpcError, Result};

static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

// LeftmostLongest keeps "&amp;lt;" from being read as "&lt;"
static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
        .expect("Failed to build XML unescaper")
});

/// Escape XML special characters for use in text and attribute values.
///
/// # Examples
///
/// ```
/// use slidewright::xml::escape_xml;
/// assert_eq!(escape_xml("Q&A <draft>"), "Q&amp;A &lt;draft&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Replace the five predefined XML entities with their characters.
///
/// Unknown entities are left as they are.
///
/// ```
/// use slidewright::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;b&gt; &amp;amp;"), "<b> &amp;");
/// assert_eq!(unescape_xml("&nbsp;"), "&nbsp;");
/// ```
#[inline]
pub fn unescape_xml(s: &str) -> String {
    XML_UNESCAPER.replace_all(s, &["&", "<", ">", "\"", "'"])
}

/// Decode a text event into an owned string.
pub(crate) fn text_content(text: &BytesText<'_>) -> Result<String> {
    let raw = std::str::from_utf8(text.as_ref())?;
    Ok(unescape_xml(raw))
}

/// Resolve an entity or character reference event (`&amp;`, `&#x2022;`).
pub(crate) fn reference_content(reference: &BytesRef<'_>) -> Result<String> {
    let name = std::str::from_utf8(reference.as_ref())?;
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        }
        .map_err(|_| OpcError::Xml(format!("Invalid character reference: &{};", name)))?;
        return char::from_u32(value)
            .map(String::from)
            .ok_or_else(|| OpcError::Xml(format!("Invalid character reference: &{};", name)));
    }
    Ok(unescape_xml(&format!("&{};", name)))
}

/// Look up an unprefixed attribute by local name.
pub(crate) fn attr(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_none() && attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Look up the relationship reference (`r:id`) of an element.
///
/// Matches any prefixed `id` attribute so templates that bind the
/// relationships namespace to another prefix still resolve.
pub(crate) fn rel_id(element: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
