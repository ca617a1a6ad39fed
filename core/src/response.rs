//! XML replies: parsing, status classification and boolean matching.
//!
//! Every reply is an XML document whose root holds a `returncode` of
//! `SUCCESS` or `FAILED`, optionally a `messageKey` and `message`, and the
//! call-specific fields. The schema is loose. Values are text, booleans are
//! the literals `true` / `false`, and any field may be missing.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::http::HttpResponse;

const SUCCESS: &str = "SUCCESS";

/// One XML element: its name, its concatenated text, and its child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn new(start: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Self::default()
        }
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

/// Why a body could not be turned into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No root element at all.
    Empty,
    /// Input ended with elements still open.
    Truncated,
    Encoding,
    Malformed(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Empty => write!(f, "empty body"),
            ParseFailure::Truncated => write!(f, "truncated document"),
            ParseFailure::Encoding => write!(f, "body is not valid UTF-8"),
            ParseFailure::Malformed(msg) => write!(f, "malformed XML: {msg}"),
        }
    }
}

/// A parsed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseFailure> {
        let text = std::str::from_utf8(bytes).map_err(|_| ParseFailure::Encoding)?;
        let mut reader = Reader::from_str(text);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| ParseFailure::Malformed(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(ParseFailure::Malformed(
                            "content after root element".to_string(),
                        ));
                    }
                    stack.push(Element::new(&start));
                }
                Event::Empty(start) => {
                    let element = Element::new(&start);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => {
                            return Err(ParseFailure::Malformed(
                                "content after root element".to_string(),
                            ))
                        }
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ParseFailure::Malformed("unbalanced end tag".to_string())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let unescaped = text
                            .unescape()
                            .map_err(|e| ParseFailure::Malformed(e.to_string()))?;
                        current.text.push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ParseFailure::Truncated);
        }
        root.map(|root| Document { root }).ok_or(ParseFailure::Empty)
    }

    /// Trimmed text of the top-level `returncode` field.
    pub fn return_code(&self) -> Option<&str> {
        self.root.child_text("returncode")
    }

    pub fn is_success(&self) -> bool {
        self.return_code() == Some(SUCCESS)
    }

    /// Trimmed text of a top-level field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.root.child_text(name)
    }
}

/// Status detail from a reply whose `returncode` is not `SUCCESS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failure {
    pub return_code: Option<String>,
    pub message_key: Option<String>,
    pub message: Option<String>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.return_code.as_deref().unwrap_or("no returncode"),
            self.message_key.as_deref().unwrap_or("-"),
            self.message.as_deref().unwrap_or("-"),
        )
    }
}

/// What the server said, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Parsed, `returncode` is `SUCCESS`.
    Success(Document),
    /// Parsed, `returncode` is missing or anything other than `SUCCESS`.
    Failed(Failure),
    /// Body could not be parsed, e.g. an HTML page from a gateway.
    Unreadable { status: u16, reason: ParseFailure },
}

impl Reply {
    /// Classify a response. The HTTP status only matters when the body cannot
    /// be parsed; a well-formed reply is judged by its `returncode`.
    pub fn interpret(response: &HttpResponse) -> Self {
        match Document::parse(&response.body) {
            Ok(doc) if doc.is_success() => Reply::Success(doc),
            Ok(doc) => {
                let failure = Failure {
                    return_code: doc.return_code().map(str::to_string),
                    message_key: doc.field("messageKey").map(str::to_string),
                    message: doc.field("message").map(str::to_string),
                };
                warn!(%failure, "server reported failure");
                Reply::Failed(failure)
            }
            Err(reason) => {
                warn!(status = response.status, %reason, "unreadable reply");
                Reply::Unreadable {
                    status: response.status,
                    reason,
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Reply::Success(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<Document> {
        match self {
            Reply::Success(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Whether the top-level `field` reads exactly `true`.
///
/// An absent document or field yields `false`, indistinguishable from an
/// explicit `false`.
pub fn match_field(document: Option<&Document>, field: &str) -> bool {
    document.and_then(|doc| doc.field(field)) == Some("true")
}
