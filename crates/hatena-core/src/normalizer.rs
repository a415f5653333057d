//! Atom document parsing and entry normalization.
//!
//! Turns the two AtomPub document shapes into [`EntryRecord`]s:
//!
//! - **Collection pages** (`<feed>` with `<entry>` children and an optional
//!   `<link rel="next">`) yield partial records: id, title, alternate link,
//!   timestamps and categories. Content is intentionally left out.
//! - **Member documents** (a lone `<entry>`) yield full records that also
//!   carry content, content type and the draft flag.
//!
//! Elements are matched on their local name, so the `atom:`/`app:`/`hatena:`
//! prefixes a server chooses do not matter.
//!
//! ```rust
//! use hatena_core::normalizer::parse_entry;
//!
//! let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom">
//!   <id>tag:blog.hatena.ne.jp,2013:blog-someone-1-42</id>
//!   <title>Hello</title>
//!   <content type="text/x-markdown"># Hello</content>
//! </entry>"#;
//!
//! let record = parse_entry(xml)?;
//! assert_eq!(record.entry_id(), "42");
//! assert_eq!(record.draft, Some(false));
//! # Ok::<(), hatena_core::Error>(())
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::instrument;

use crate::{EntryContent, EntryRecord, Error, Result};

const DEFAULT_CONTENT_TYPE: &str = "text";

/// A parsed collection page.
#[derive(Debug)]
pub struct FeedDocument {
    /// One result per `<entry>`, in document order.
    pub entries: Vec<Result<EntryRecord>>,
    /// Href of the `next` link relation, if present.
    pub next: Option<String>,
}

/// Minimal element tree built from the event stream.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.trim().to_string())
    }

    fn link_href(&self, rel: &str) -> Option<String> {
        self.children_named("link")
            .find(|l| l.attr("rel") == Some(rel))
            .and_then(|l| l.attr("href"))
            .map(str::to_string)
    }

    fn descendant(&self, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.descendant(name) })
    }
}

/// Parse a collection page into list-form records and the next cursor.
///
/// # Errors
///
/// [`Error::Parse`] when the body is not well-formed XML or has no root
/// element. Per-entry problems are reported inside
/// [`FeedDocument::entries`] instead.
#[instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_feed(xml: &str) -> Result<FeedDocument> {
    let root = parse_tree(xml)?;
    let entries = root
        .children_named("entry")
        .map(normalize_list_entry)
        .collect();
    let next = root.link_href("next");
    Ok(FeedDocument { entries, next })
}

/// Parse a member document into a full record.
///
/// Accepts either a bare `<entry>` root or a feed wrapping a single entry.
///
/// # Errors
///
/// [`Error::Parse`] for invalid XML, [`Error::MalformedRecord`] when no entry
/// is present or required fields are missing.
#[instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_entry(xml: &str) -> Result<EntryRecord> {
    let root = parse_tree(xml)?;
    let entry = if root.name == "entry" {
        &root
    } else {
        root.child("entry")
            .ok_or_else(|| Error::MalformedRecord("document contains no <entry>".into()))?
    };
    normalize_full_entry(entry)
}

fn normalize_list_entry(entry: &Node) -> Result<EntryRecord> {
    let id = entry
        .child_text("id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MalformedRecord("entry is missing <id>".into()))?;
    let title = entry
        .child_text("title")
        .ok_or_else(|| Error::MalformedRecord(format!("entry {id} is missing <title>")))?;

    Ok(EntryRecord {
        link: entry.link_href("alternate"),
        published: entry.child_text("published"),
        updated: entry.child_text("updated"),
        categories: entry
            .children_named("category")
            .filter_map(|c| c.attr("term"))
            .map(str::to_string)
            .collect(),
        id,
        title,
        content: None,
        draft: None,
    })
}

fn normalize_full_entry(entry: &Node) -> Result<EntryRecord> {
    let mut record = normalize_list_entry(entry)?;

    // A member document without <content> still counts as loaded: empty body.
    let content = entry.child("content");
    record.content = Some(EntryContent {
        text: content.map(|c| c.text.clone()).unwrap_or_default(),
        content_type: content
            .and_then(|c| c.attr("type"))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    });
    record.draft = Some(
        entry
            .descendant("draft")
            .is_some_and(|d| d.text.trim().eq_ignore_ascii_case("yes")),
    );
    Ok(record)
}

fn parse_tree(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(open_node(&e)?),
            Event::Empty(e) => {
                let node = open_node(&e)?;
                attach(&mut stack, &mut root, node);
            },
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            },
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape()?);
                }
            },
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".into()))
}

fn open_node(start: &BytesStart<'_>) -> Result<Node> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Node {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attrs,
        ..Node::default()
    })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        },
    }
}
