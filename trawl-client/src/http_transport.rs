//! HTTP transport for Elasticsearch-compatible search engines

use serde::Serialize;
use std::time::Duration;
use trawl_core::{decode_error, Query, RawResponse, Transport, TrawlError};

/// Blocking [`Transport`] over the `_search?scroll=` REST API.
///
/// Each round-trip is bounded by `request_timeout`; the scroll lease is sent
/// to the server separately on every request.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct ScrollRequest<'a> {
    scroll: String,
    scroll_id: &'a str,
}

#[derive(Serialize)]
struct ClearScrollRequest<'a> {
    scroll_id: [&'a str; 1],
}

impl HttpTransport {
    pub fn new(base_url: &str, request_timeout: Duration) -> trawl_core::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(TrawlError::transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> trawl_core::Result<RawResponse> {
        let resp = req.send().map_err(|e| self.map_err(e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(|e| self.map_err(e))?;
        Ok(RawResponse::new(status, body.to_vec()))
    }

    /// `{base}/{index}/_search`, with the index encoded as one path segment.
    fn search_url(&self, index: &str) -> trawl_core::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(TrawlError::transport)?;
        url.path_segments_mut()
            .map_err(|_| TrawlError::transport(format!("cannot-be-a-base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push(index)
            .push("_search");
        Ok(url)
    }

    fn map_err(&self, err: reqwest::Error) -> TrawlError {
        if err.is_timeout() {
            TrawlError::Timeout(self.request_timeout)
        } else {
            TrawlError::transport(err)
        }
    }
}

impl Transport for HttpTransport {
    fn submit(&self, index: &str, query: &Query, lease: Duration) -> trawl_core::Result<RawResponse> {
        let url = self.search_url(index)?;
        tracing::debug!(%url, size = query.size(), "submitting scroll search");
        self.send(
            self.client
                .post(url)
                .query(&[
                    ("scroll", format_lease(lease)),
                    ("track_total_hits", "true".to_string()),
                ])
                .json(query),
        )
    }

    fn redeem(&self, token: &str, lease: Duration) -> trawl_core::Result<RawResponse> {
        let url = format!("{}/_search/scroll", self.base_url);
        let req = ScrollRequest {
            scroll: format_lease(lease),
            scroll_id: token,
        };
        self.send(self.client.post(&url).json(&req))
    }

    fn release(&self, token: &str) -> trawl_core::Result<()> {
        let url = format!("{}/_search/scroll", self.base_url);
        let req = ClearScrollRequest { scroll_id: [token] };
        let raw = self.send(self.client.delete(&url).json(&req))?;
        // 404: context already expired
        if raw.is_error() && raw.status != 404 {
            return Err(decode_error(&raw));
        }
        Ok(())
    }
}

/// Render a lease in Elasticsearch time units.
pub fn format_lease(lease: Duration) -> String {
    if lease.subsec_nanos() == 0 {
        format!("{}s", lease.as_secs())
    } else {
        format!("{}ms", lease.as_millis().max(1))
    }
}
