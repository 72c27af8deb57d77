//! HTML-like markup for marked documents.
//!
//! Tracked runs are written as `<ins>`/`<del>` elements carrying the author
//! id, author nickname and change date as `data-op-*` attributes. Formatting
//! marks become `<strong>`, `<em>` and `<code>`. Elements are always properly
//! nested: tracked marks sit outermost, and a formatting mark that crosses a
//! tracked boundary is closed and reopened around it.

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use regex::Regex;
use thiserror::Error;

use crate::editing::{
    ChangeAttrs, Document, DocumentModel, Fragment, Mark, MarkKind, MarkSet, MarkSpan,
};

const USER_ID: &str = "data-op-user-id";
const USER_NICKNAME: &str = "data-op-user-nickname";
const DATE: &str = "data-op-date";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("</{tag}> at byte {at} does not close the innermost open element")]
    UnbalancedTag { tag: String, at: usize },

    #[error("<{0}> is never closed")]
    UnclosedTag(String),

    #[error("invalid change date {value:?}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| {
        Regex::new(r#"<(?P<close>/)?(?P<name>ins|del|strong|em|code)(?P<attrs>(?:\s+[a-z-]+="[^"]*")*)\s*>"#)
            .expect("Invalid tag regex")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"(?P<key>[a-z-]+)="(?P<value>[^"]*)""#).expect("Invalid attribute regex")
    })
}

fn tag_name(kind: MarkKind) -> &'static str {
    match kind {
        MarkKind::Insertion => "ins",
        MarkKind::Deletion => "del",
        MarkKind::Strong => "strong",
        MarkKind::Emphasis => "em",
        MarkKind::Code => "code",
    }
}

/// Render a document's text and marks as markup
pub fn to_markup<D: DocumentModel + ?Sized>(doc: &D) -> String {
    let len = doc.len();
    let spans = doc.mark_spans(0..len);

    let mut bounds: Vec<usize> = spans
        .iter()
        .flat_map(|span| [span.range.start, span.range.end])
        .chain([0, len])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::with_capacity(len);
    let mut open: Vec<&Mark> = Vec::new();
    for pair in bounds.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let mut active: Vec<&Mark> = spans
            .iter()
            .filter(|span| span.range.start <= from && span.range.end >= to)
            .map(|span| &span.mark)
            .collect();
        active.sort_by_key(|mark| mark.kind());

        let shared = open
            .iter()
            .zip(&active)
            .take_while(|(was, now)| was == now)
            .count();
        for mark in open.drain(shared..).rev() {
            close_tag(&mut out, mark);
        }
        for mark in &active[shared..] {
            open_tag(&mut out, mark);
        }
        open = active;

        out.push_str(&encode_text(&doc.text_slice(from..to)));
    }
    for mark in open.into_iter().rev() {
        close_tag(&mut out, mark);
    }
    out
}

fn open_tag(out: &mut String, mark: &Mark) {
    let name = tag_name(mark.kind());
    match mark.attrs() {
        Some(attrs) => out.push_str(&format!(
            r#"<{name} {USER_ID}="{}" {USER_NICKNAME}="{}" {DATE}="{}">"#,
            encode_double_quoted_attribute(&attrs.author_id),
            encode_double_quoted_attribute(&attrs.author_name),
            attrs.changed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )),
        None => out.push_str(&format!("<{name}>")),
    }
}

fn close_tag(out: &mut String, mark: &Mark) {
    out.push_str(&format!("</{}>", tag_name(mark.kind())));
}

/// Parse markup produced by [`to_markup`] back into a document
///
/// Elements other than the five mark elements are kept as literal text.
pub fn parse_markup(input: &str) -> Result<Document, MarkupError> {
    let mut text = String::with_capacity(input.len());
    let mut spans = Vec::new();
    let mut open: Vec<(Mark, usize)> = Vec::new();
    let mut cursor = 0;

    for caps in tag_regex().captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        text.push_str(&decode_html_entities(&input[cursor..whole.start()]));
        cursor = whole.end();

        let name = caps.name("name").map_or("", |m| m.as_str());
        if caps.name("close").is_some() {
            match open.pop() {
                Some((mark, start)) if tag_name(mark.kind()) == name => {
                    spans.push(MarkSpan::new(start..text.len(), mark));
                }
                _ => {
                    return Err(MarkupError::UnbalancedTag {
                        tag: name.to_string(),
                        at: whole.start(),
                    });
                }
            }
        } else {
            let attrs = caps.name("attrs").map_or("", |m| m.as_str());
            open.push((parse_mark(name, attrs)?, text.len()));
        }
    }
    text.push_str(&decode_html_entities(&input[cursor..]));

    if let Some((mark, _)) = open.pop() {
        return Err(MarkupError::UnclosedTag(tag_name(mark.kind()).to_string()));
    }
    Ok(Document::from_fragment(Fragment::new(
        text,
        MarkSet::from_spans(spans),
    )))
}

fn parse_mark(name: &str, attrs: &str) -> Result<Mark, MarkupError> {
    let tracked = |attrs: &str| -> Result<ChangeAttrs, MarkupError> {
        let mut parsed = ChangeAttrs::default();
        for caps in attr_regex().captures_iter(attrs) {
            let key = caps.name("key").map_or("", |m| m.as_str());
            let value = decode_html_entities(caps.name("value").map_or("", |m| m.as_str()));
            match key {
                USER_ID => parsed.author_id = value.into_owned(),
                USER_NICKNAME => parsed.author_name = value.into_owned(),
                DATE => {
                    let date = DateTime::parse_from_rfc3339(&value).map_err(|source| {
                        MarkupError::InvalidDate {
                            value: value.to_string(),
                            source,
                        }
                    })?;
                    parsed.changed_at = date.with_timezone(&Utc);
                }
                _ => {}
            }
        }
        Ok(ChangeAttrs::new(
            parsed.author_id,
            parsed.author_name,
            parsed.changed_at,
        ))
    };

    Ok(match name {
        "ins" => Mark::Insertion(tracked(attrs)?),
        "del" => Mark::Deletion(tracked(attrs)?),
        "strong" => Mark::Strong,
        "em" => Mark::Emphasis,
        _ => Mark::Code,
    })
}
