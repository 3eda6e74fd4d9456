//! Tag lookups over capabilities XML.
//!
//! Capabilities documents can be several megabytes, so these functions scan
//! the text with a streaming reader and hand back slices of the input rather
//! than building a tree. Tag names are compared exactly, prefix included
//! (`ows:Operation` only matches `ows:Operation`).

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use ogc_common::{OgcError, OgcResult};

/// An element located in an XML string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Text between the opening and closing tags; empty for self-closing tags
    pub inner: &'a str,
    /// The full element text, opening tag through closing tag
    pub outer: &'a str,
}

impl<'a> Tag<'a> {
    /// Unescaped, trimmed text content. CDATA sections are returned as-is.
    pub fn text(&self) -> OgcResult<Cow<'a, str>> {
        let trimmed = self.inner.trim();
        if let Some(cdata) = trimmed
            .strip_prefix("<![CDATA[")
            .and_then(|s| s.strip_suffix("]]>"))
        {
            return Ok(Cow::Borrowed(cdata));
        }
        quick_xml::escape::unescape(trimmed).map_err(|e| OgcError::Xml(e.to_string()))
    }

    /// Attribute of this element's opening tag.
    pub fn attribute(&self, name: &str) -> OgcResult<Option<String>> {
        get_attribute(self.outer, name)
    }
}

/// Which elements a scan may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Any depth; matches never overlap
    Anywhere,
    /// Only top-level elements of the scanned text
    Children,
}

/// First element named `name`, at any depth.
pub fn find_tag_by_name<'a>(xml: &'a str, name: &str) -> OgcResult<Option<Tag<'a>>> {
    Ok(scan(xml, name, Scope::Anywhere, true)?.into_iter().next())
}

/// All elements named `name` in document order.
///
/// Scanning resumes after the end of each match, so an element nested
/// inside an earlier match of the same name is not returned separately.
pub fn find_tags_by_name<'a>(xml: &'a str, name: &str) -> OgcResult<Vec<Tag<'a>>> {
    scan(xml, name, Scope::Anywhere, false)
}

/// All elements reached by descending `path`.
///
/// The first step may match at any depth; each following step only matches
/// direct children of the previous step's elements.
pub fn find_tags_by_path<'a, S: AsRef<str>>(xml: &'a str, path: &[S]) -> OgcResult<Vec<Tag<'a>>> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(Vec::new());
    };

    let mut current = find_tags_by_name(xml, first.as_ref())?;
    for step in rest {
        let mut next = Vec::new();
        for tag in &current {
            next.extend(scan(tag.inner, step.as_ref(), Scope::Children, false)?);
        }
        current = next;
    }
    Ok(current)
}

/// First element reached by descending `path`.
pub fn find_tag_by_path<'a, S: AsRef<str>>(xml: &'a str, path: &[S]) -> OgcResult<Option<Tag<'a>>> {
    Ok(find_tags_by_path(xml, path)?.into_iter().next())
}

/// Value of attribute `name` on the opening tag of `tag_outer`.
///
/// Handles single and double quotes and prefixed names such as `xlink:href`.
/// Attributes of nested elements are never consulted.
pub fn get_attribute(tag_outer: &str, name: &str) -> OgcResult<Option<String>> {
    let mut reader = Reader::from_str(tag_outer);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return attribute_of(&e, name),
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }
}

/// Attribute of the document's root element, e.g. its `version`.
///
/// The root is the first element event of `xml`; the declaration, comments,
/// processing instructions and DOCTYPE of the prolog are skipped. Passing a
/// fragment yields the attribute of its first element.
pub fn get_root_attribute(xml: &str, name: &str) -> OgcResult<Option<String>> {
    get_attribute(xml, name)
}

/// Local name of the document's root element.
pub fn root_name(xml: &str) -> OgcResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(Some(
                    String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                ))
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }
}

pub(crate) fn attribute_of(e: &BytesStart<'_>, name: &str) -> OgcResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| OgcError::Xml(err.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| OgcError::Xml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) fn xml_error<R>(reader: &Reader<R>, err: quick_xml::Error) -> OgcError {
    OgcError::Xml(format!("at position {}: {}", reader.buffer_position(), err))
}

/// Offset of the `<` that opens the markup the reader was at.
///
/// `pos` is the reader position before the event was read, which sits on or
/// just past the `<` depending on the preceding event.
fn markup_start(xml: &str, pos: usize) -> usize {
    let upto = (pos + 1).min(xml.len());
    xml.as_bytes()[..upto]
        .iter()
        .rposition(|&b| b == b'<')
        .unwrap_or(pos)
}

fn scan<'a>(xml: &'a str, name: &str, scope: Scope, first_only: bool) -> OgcResult<Vec<Tag<'a>>> {
    let mut reader = Reader::from_str(xml);
    let mut matches = Vec::new();
    let mut depth = 0usize;
    // (outer start, inner start, depth) of the match being captured
    let mut open: Option<(usize, usize, usize)> = None;

    loop {
        let before = reader.buffer_position();
        let eligible = open.is_none() && (scope == Scope::Anywhere || depth == 0);

        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if eligible && e.name().as_ref() == name.as_bytes() {
                    open = Some((markup_start(xml, before), reader.buffer_position(), depth));
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if eligible && e.name().as_ref() == name.as_bytes() {
                    let start = markup_start(xml, before);
                    matches.push(Tag {
                        inner: "",
                        outer: &xml[start..reader.buffer_position()],
                    });
                    if first_only {
                        break;
                    }
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if let Some((start, inner_start, open_depth)) = open {
                    if open_depth == depth {
                        let inner_end = markup_start(xml, before);
                        matches.push(Tag {
                            inner: &xml[inner_start..inner_end],
                            outer: &xml[start..reader.buffer_position()],
                        });
                        open = None;
                        if first_only {
                            break;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    Ok(matches)
}
