//! Feed retrieval and RSS parsing.
//!
//! [`fetch_text`] performs one bounded GET and turns any non-2xx answer into a
//! [`FetchError`]. [`parse`] turns syndication XML into [`RawItem`]s, returning
//! an empty list (and logging) when the document is malformed.

use crate::error::{FetchError, ParseError};
use crate::models::RawItem;
use crate::transport::{RequestOptions, Transport};
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::Event;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// GET `url` following redirects and return the body of a 2xx response.
#[instrument(level = "debug", skip(transport))]
pub async fn fetch_text<T: Transport>(
    transport: &T,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    if url.trim().is_empty() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    let response = transport.get(url, RequestOptions::follow(timeout)).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}

/// Which child of `<item>` is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: String,
    link: String,
    description: String,
}

impl ItemBuilder {
    fn buffer(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
        }
    }

    fn finish(self, max_description_chars: usize) -> Option<RawItem> {
        let title = collapse_whitespace(&decode_entities(&self.title));
        if title.is_empty() {
            return None;
        }
        let link = decode_entities(&self.link).trim().to_string();
        let description = clean_description(&self.description, max_description_chars);
        Some(RawItem {
            title,
            link,
            description,
        })
    }
}

/// Parse RSS XML into items in document order.
///
/// Malformed XML yields an empty list; the failure is logged, never returned.
pub fn parse(xml: &str, max_description_chars: usize) -> Vec<RawItem> {
    match try_parse(xml, max_description_chars) {
        Ok(items) => {
            debug!(count = items.len(), "Parsed feed items");
            items
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse feed XML");
            Vec::new()
        }
    }
}

/// Strict variant of [`parse`] that reports the XML error.
pub fn try_parse(xml: &str, max_description_chars: usize) -> Result<Vec<RawItem>, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut field: Option<Field> = None;
    // Depth of elements nested inside the current field (inline XHTML).
    let mut nested = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Malformed {
            position: reader.error_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let name = start.name();
                if name.as_ref() == b"item" {
                    current = Some(ItemBuilder::default());
                    field = None;
                } else if field.is_some() {
                    nested += 1;
                } else if current.is_some() {
                    field = Field::from_tag(name.as_ref());
                    nested = 0;
                }
            }
            Event::End(end) => {
                let name = end.name();
                if name.as_ref() == b"item" {
                    if let Some(item) = current.take().and_then(|b| b.finish(max_description_chars)) {
                        items.push(item);
                    }
                    field = None;
                } else if field.is_some() && nested > 0 {
                    nested -= 1;
                } else if field.is_some() {
                    field = None;
                }
            }
            Event::Text(text) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    builder.buffer(f).push_str(&String::from_utf8_lossy(&text));
                }
            }
            Event::CData(data) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    builder.buffer(f).push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::GeneralRef(reference) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    let out = builder.buffer(f);
                    let name = String::from_utf8_lossy(&reference);
                    match reference.resolve_char_ref() {
                        Ok(Some(ch)) => out.push(ch),
                        // Named references beyond the XML five are left for the HTML entity pass.
                        _ => match resolve_xml_entity(&name) {
                            Some(resolved) => out.push_str(resolved),
                            None => {
                                out.push('&');
                                out.push_str(&name);
                                out.push(';');
                            }
                        },
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Decode entities, strip markup, collapse whitespace and cap the length.
pub fn clean_description(raw: &str, max_chars: usize) -> String {
    let decoded = decode_entities(raw);
    let stripped = TAGS.replace_all(&decoded, " ");
    // A second decode catches entities that were double-escaped inside the markup.
    let text = collapse_whitespace(&decode_entities(&stripped));
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}
