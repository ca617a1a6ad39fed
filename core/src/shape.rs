//! Shape-driven extraction of structured records from replies.
//!
//! Each operation declares the fields it expects as a static [`Shape`]. A
//! single routine, [`extract`], walks a [`Document`] against that shape and
//! either yields a complete [`Record`] or nothing at all.

use std::collections::BTreeMap;

use crate::response::{Document, Element};

/// How the text of a field is coerced.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Passed through, trimmed.
    Text,
    /// Parsed as a signed decimal integer.
    Int,
    /// `true` when the text is exactly `true`, otherwise `false`.
    Bool,
    /// A container element whose `item` children each become a sub-record.
    Group {
        item: &'static str,
        shape: &'static Shape,
    },
}

/// One expected field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Element name in the reply.
    pub element: &'static str,
    /// Key in the resulting record.
    pub key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub const fn text(element: &'static str, key: &'static str) -> Self {
        Self::required(element, key, FieldKind::Text)
    }

    pub const fn int(element: &'static str, key: &'static str) -> Self {
        Self::required(element, key, FieldKind::Int)
    }

    pub const fn bool(element: &'static str, key: &'static str) -> Self {
        Self::required(element, key, FieldKind::Bool)
    }

    pub const fn group(
        element: &'static str,
        key: &'static str,
        item: &'static str,
        shape: &'static Shape,
    ) -> Self {
        Self::required(element, key, FieldKind::Group { item, shape })
    }

    /// Same field, but its absence does not void the record. A missing
    /// optional group extracts as an empty list.
    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    const fn required(element: &'static str, key: &'static str, kind: FieldKind) -> Self {
        Self {
            element,
            key,
            kind,
            required: true,
        }
    }
}

/// Ordered field descriptors for one element type.
#[derive(Debug)]
pub struct Shape {
    pub fields: &'static [FieldDef],
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<Record>),
}

/// Field name to value, for the fields that were present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<&'static str, Value>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Record]> {
        match self.get(key) {
            Some(Value::List(items)) => Some(items),
            _ => None,
        }
    }
}

/// Extract a record from the root of a successful reply.
///
/// `None` when the document is absent, its `returncode` is not `SUCCESS`, or
/// any required field at any depth is missing or not coercible.
pub fn extract(document: Option<&Document>, shape: &Shape) -> Option<Record> {
    let doc = document.filter(|d| d.is_success())?;
    extract_element(&doc.root, shape)
}

/// Extract a record from an arbitrary element. Does not look at status.
pub fn extract_element(element: &Element, shape: &Shape) -> Option<Record> {
    let mut record = Record::default();

    for field in shape.fields {
        let value = match field.kind {
            FieldKind::Text => element
                .child_text(field.element)
                .map(|t| Value::Text(t.to_string())),
            FieldKind::Int => element
                .child_text(field.element)
                .and_then(|t| t.parse::<i64>().ok())
                .map(Value::Int),
            FieldKind::Bool => element
                .child_text(field.element)
                .map(|t| Value::Bool(t == "true")),
            FieldKind::Group { item, shape } => match element.child(field.element) {
                Some(container) => {
                    let items = container
                        .children_named(item)
                        .map(|child| extract_element(child, shape))
                        .collect::<Option<Vec<_>>>()?;
                    Some(Value::List(items))
                }
                None if field.required => None,
                None => Some(Value::List(Vec::new())),
            },
        };

        match value {
            Some(value) => {
                record.fields.insert(field.key, value);
            }
            None if field.required => return None,
            None => {}
        }
    }

    Some(record)
}
