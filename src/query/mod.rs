use bson::{Bson, Document};
use crate::util::bson_utils::bson_eq;

pub mod execution;
pub mod parser;
pub mod update;

/// An exact-match query: a document matches if every field of the filter is equal to
/// the document field of the same name.
///
/// Keys are top-level field names, a dotted key is matched literally. A `null` value
/// matches both a `null` and a missing field. Numbers compare by value across types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Document,
}

impl Filter {
    pub(crate) fn new(conditions: Document) -> Self {
        Filter { conditions }
    }

    /// A filter matching every document.
    pub fn all() -> Self {
        Filter::default()
    }

    /// A filter on a single field.
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        let mut conditions = Document::new();
        conditions.insert(field, value.into());
        Filter { conditions }
    }

    pub fn conditions(&self) -> &Document {
        &self.conditions
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| match doc.get(field) {
            Some(actual) => bson_eq(actual, expected),
            None => matches!(expected, Bson::Null),
        })
    }
}
