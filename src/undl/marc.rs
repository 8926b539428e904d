//! MARCXML decoding for Digital Library search responses

use crate::domain::{Record, SearchResults};
use crate::error::Result;
use chrono::NaiveDate;
use roxmltree::{Document, Node};
use tracing::warn;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%d %B %Y"];

/// Decode a search response.
///
/// Accepts both the wrapped form (`<response><total/><search_id/><collection/>`)
/// and a bare `<collection>`. Element names are matched without namespaces.
pub fn parse_search_response(xml: &str) -> Result<SearchResults> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let records: Vec<Record> = root
        .descendants()
        .filter(|n| is_element(n, "record"))
        .filter_map(|node| {
            let record = parse_record(node);
            if record.id.is_empty() {
                warn!("Skipping MARC record without a 001 control number");
                None
            } else {
                Some(record)
            }
        })
        .collect();

    let total = child_text(root, "total")
        .and_then(|t| t.parse().ok())
        .unwrap_or(records.len() as u64);
    let search_id = child_text(root, "search_id");

    Ok(SearchResults {
        total,
        search_id,
        records,
    })
}

pub fn parse_record(node: Node) -> Record {
    let mut record = Record::default();
    let mut title_parts: Vec<String> = Vec::new();

    for field in node.children().filter(|n| n.is_element()) {
        let tag = field.attribute("tag").unwrap_or_default();
        match field.tag_name().name() {
            "controlfield" if tag == "001" => {
                record.id = node_text(field).unwrap_or_default();
            }
            "datafield" => match tag {
                "041" => record.languages.extend(subfields(field, "a")),
                "191" => {
                    if record.symbol.is_none() {
                        record.symbol = subfields(field, "a").into_iter().next();
                    }
                }
                "245" => {
                    title_parts.extend(subfields(field, "a"));
                    title_parts.extend(subfields(field, "b"));
                }
                "269" => {
                    if let Some(raw) = subfields(field, "a").into_iter().next() {
                        record.date = parse_date(&raw);
                        record.publication_date = Some(raw);
                    }
                }
                "520" => {
                    if record.summary.is_none() {
                        record.summary = subfields(field, "a").into_iter().next();
                    }
                }
                "650" => record.subjects.extend(subfields(field, "a")),
                "710" => record.authors.extend(subfields(field, "a")),
                "856" => record.downloads.extend(subfields(field, "u")),
                "993" => record.related.extend(subfields(field, "a")),
                _ => {}
            },
            _ => {}
        }
    }

    let title = title_parts
        .iter()
        .map(|part| strip_isbd_punctuation(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" : ");
    if !title.is_empty() {
        record.title = Some(title);
    }

    record
}

/// Full dates only; a bare year stays in `publication_date`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child_text(node: Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| is_element(n, name))
        .and_then(node_text)
}

fn node_text(node: Node) -> Option<String> {
    let text = node.text()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn subfields(field: Node, code: &str) -> Vec<String> {
    field
        .children()
        .filter(|n| is_element(n, "subfield") && n.attribute("code") == Some(code))
        .filter_map(node_text)
        .collect()
}

// Cataloguing punctuation such as "Title :" or "resolution /"
fn strip_isbd_punctuation(part: &str) -> &str {
    part.trim()
        .trim_end_matches(|c: char| matches!(c, ':' | '/' | ';' | ',' | '=') || c.is_whitespace())
}
