//! Document model for search hits

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single search hit: identifier plus an opaque source payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    pub source: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            index: None,
            source,
        }
    }

    /// Decode the source payload into the caller's own schema.
    pub fn source_as<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(T::deserialize(&self.source)?)
    }
}

/// Whether a reported total is exact or a lower bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    #[default]
    Eq,
    Gte,
}

impl TotalRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gte => "gte",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "gte" => Some(Self::Gte),
            _ => None,
        }
    }
}

/// `hits.total` as reported by the search engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    pub relation: TotalRelation,
}

impl TotalHits {
    pub fn exact(value: u64) -> Self {
        Self {
            value,
            relation: TotalRelation::Eq,
        }
    }
}
