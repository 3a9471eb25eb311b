//! RecordStore trait: the abstraction over the tabular records service.
//!
//! Every record lookup is the same shape: a table name, an optional filter
//! over named fields, and an optional field projection, returning zero or
//! more field maps. [`TableQuery`] describes that shape once so the typed
//! lookups in `averygate-records` don't each build request strings by hand.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// The raw field map of one record, as returned by the records service.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// A filter over one named field.
///
/// Values are always escaped when rendered, so caller-supplied strings can
/// never terminate the string literal and inject formula syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// `{field} = 'value'`
    Equals { field: String, value: String },
    /// Case-insensitive substring match of `needle` inside `{field}`.
    ContainsIgnoreCase { field: String, needle: String },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains_ignore_case(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Render as a records-service formula.
    pub fn to_formula(&self) -> String {
        match self {
            Filter::Equals { field, value } => {
                format!("{}={}", field_ref(field), string_literal(value))
            }
            Filter::ContainsIgnoreCase { field, needle } => format!(
                "SEARCH(LOWER({}), LOWER({}))",
                string_literal(needle),
                field_ref(field)
            ),
        }
    }
}

fn field_ref(field: &str) -> String {
    format!("{{{}}}", field.replace('}', "\\}"))
}

/// Quote a value as a single-quoted formula string literal.
fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            // Line breaks would end the formula early.
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// A parameterized read against one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    /// Table name, e.g. "Roadmap Table"
    pub table: String,

    /// Optional row filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// Fields to return. Empty = all fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    /// Maximum number of records to return. `None` = all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<u32>,
}

impl TableQuery {
    /// Query every record of a table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            fields: Vec::new(),
            max_records: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Only the first matching record is needed.
    pub fn first(mut self) -> Self {
        self.max_records = Some(1);
        self
    }

    pub fn formula(&self) -> Option<String> {
        self.filter.as_ref().map(Filter::to_formula)
    }
}

/// The core RecordStore trait.
///
/// Implementations are stateless single-round-trip readers (paging aside);
/// "no matching records" is `Ok(vec![])`, never an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// A human-readable name for this store (e.g., "airtable").
    fn name(&self) -> &str;

    /// Run a query and return the field map of every matching record.
    async fn query(&self, query: &TableQuery) -> std::result::Result<Vec<FieldMap>, RecordError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_formula() {
        let f = Filter::equals("Email", "ada@example.com");
        assert_eq!(f.to_formula(), "{Email}='ada@example.com'");
    }

    #[test]
    fn contains_formula_lowercases_both_sides() {
        let f = Filter::contains_ignore_case("Tags", "Marketing");
        assert_eq!(f.to_formula(), "SEARCH(LOWER('Marketing'), LOWER({Tags}))");
    }

    #[test]
    fn quotes_in_values_are_escaped() {
        let f = Filter::equals("Email", "x' OR TRUE() OR '");
        assert_eq!(f.to_formula(), r"{Email}='x\' OR TRUE() OR \''");
    }

    #[test]
    fn backslashes_are_escaped_before_quotes() {
        let f = Filter::equals("Stage", r"a\'b");
        assert_eq!(f.to_formula(), r"{Stage}='a\\\'b'");
    }

    #[test]
    fn newlines_are_escaped() {
        let f = Filter::equals("Stage", "a\nb");
        assert_eq!(f.to_formula(), r"{Stage}='a\nb'");
    }

    #[test]
    fn query_builder() {
        let q = TableQuery::table("Lesson URL's")
            .filter(Filter::equals("LessonName_LinkName", "Intro"))
            .fields(["Link"])
            .first();
        assert_eq!(q.table, "Lesson URL's");
        assert_eq!(q.max_records, Some(1));
        assert_eq!(q.fields, vec!["Link".to_string()]);
        assert_eq!(q.formula().unwrap(), "{LessonName_LinkName}='Intro'");
    }

    #[test]
    fn unfiltered_query_has_no_formula() {
        assert!(TableQuery::table("All Courses").formula().is_none());
    }
}
