//! Page decoding for raw search responses
//!
//! Success bodies are walked field by field so that a shape mismatch is
//! reported against the exact field that broke (`hits`, `hits.total.value`,
//! `hits.hits[3]._id`, ...) instead of a generic parse failure.

use crate::document::{Document, TotalHits, TotalRelation};
use crate::error::TrawlError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One undecoded response as returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !(200..300).contains(&self.status)
    }
}

/// One decoded batch of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    pub total: Option<TotalHits>,
    pub scroll_id: Option<String>,
}

impl Page {
    pub fn hit_count(&self) -> usize {
        self.documents.len()
    }
}

/// Decode a raw response into a [`Page`], or the error it describes.
pub fn decode_page(raw: &RawResponse) -> crate::Result<Page> {
    if raw.is_error() {
        return Err(decode_error(raw));
    }

    let body: Value =
        serde_json::from_slice(&raw.body).map_err(|_| TrawlError::decode("body"))?;
    let body = body.as_object().ok_or_else(|| TrawlError::decode("body"))?;

    let hits = body
        .get("hits")
        .and_then(Value::as_object)
        .ok_or_else(|| TrawlError::decode("hits"))?;

    let total = decode_total(hits.get("total"))?;

    let documents = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| TrawlError::decode("hits.hits"))?
        .iter()
        .enumerate()
        .map(|(i, hit)| decode_document(i, hit))
        .collect::<crate::Result<Vec<_>>>()?;

    let scroll_id = match body.get("_scroll_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => return Err(TrawlError::decode("_scroll_id")),
    };

    Ok(Page {
        documents,
        total,
        scroll_id,
    })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    reason: String,
}

/// Decode the `{"error": {"type", "reason"}}` envelope of a non-2xx response.
pub fn decode_error(raw: &RawResponse) -> TrawlError {
    match serde_json::from_slice::<ErrorEnvelope>(&raw.body) {
        Ok(envelope) => TrawlError::Remote {
            status: raw.status,
            kind: envelope.error.kind,
            reason: envelope.error.reason,
        },
        Err(_) => TrawlError::Malformed { status: raw.status },
    }
}

fn decode_total(total: Option<&Value>) -> crate::Result<Option<TotalHits>> {
    match total {
        None | Some(Value::Null) => Ok(None),
        // rest_total_hits_as_int / pre-7.0 servers report a bare count
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|value| Some(TotalHits::exact(value)))
            .ok_or_else(|| TrawlError::decode("hits.total")),
        Some(Value::Object(obj)) => {
            let value = obj
                .get("value")
                .and_then(Value::as_u64)
                .ok_or_else(|| TrawlError::decode("hits.total.value"))?;
            let relation = match obj.get("relation") {
                None => TotalRelation::Eq,
                Some(Value::String(s)) => TotalRelation::parse(s)
                    .ok_or_else(|| TrawlError::decode("hits.total.relation"))?,
                Some(_) => return Err(TrawlError::decode("hits.total.relation")),
            };
            Ok(Some(TotalHits { value, relation }))
        }
        Some(_) => Err(TrawlError::decode("hits.total")),
    }
}

fn decode_document(i: usize, hit: &Value) -> crate::Result<Document> {
    let hit = hit
        .as_object()
        .ok_or_else(|| TrawlError::decode(format!("hits.hits[{i}]")))?;

    let id = string_field(hit, "_id")
        .ok_or_else(|| TrawlError::decode(format!("hits.hits[{i}]._id")))?;
    let source = hit
        .get("_source")
        .ok_or_else(|| TrawlError::decode(format!("hits.hits[{i}]._source")))?;
    let index = match hit.get("_index") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(TrawlError::decode(format!("hits.hits[{i}]._index"))),
    };

    Ok(Document {
        id: id.to_string(),
        index,
        source: source.clone(),
    })
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}
