//! Query builder for the initial scroll request

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Opaque search request body plus the requested page size.
///
/// Serializes to `{"query": <clause>, "size": N, ...extra}`. The clause is never
/// inspected; it is handed to the search engine as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    query: Value,
    size: usize,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Query {
    /// `match_all` with the default page size
    pub fn match_all() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Requested page size (always at least 1)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clause(&self) -> &Value {
        &self.query
    }

    /// Render the request body sent with the first request.
    pub fn to_body(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert("query".to_string(), self.query.clone());
        body.insert("size".to_string(), Value::from(self.size));
        Value::Object(body)
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::match_all()
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    filter: Option<Value>,
    size: usize,
    extra: Map<String, Value>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            filter: None,
            size: DEFAULT_PAGE_SIZE,
            extra: Map::new(),
        }
    }
}

impl QueryBuilder {
    /// Replace `match_all` with a caller-supplied query clause.
    pub fn filter(mut self, clause: Value) -> Self {
        self.filter = Some(clause);
        self
    }

    /// Page size; 0 is raised to 1.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    /// Extra top-level body field such as `sort` or `_source`.
    /// `query` and `size` are owned by the builder and ignored here.
    pub fn body_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "query" && key != "size" {
            self.extra.insert(key, value);
        }
        self
    }

    pub fn build(self) -> Query {
        Query {
            query: self.filter.unwrap_or_else(|| json!({ "match_all": {} })),
            size: self.size,
            extra: self.extra,
        }
    }
}
