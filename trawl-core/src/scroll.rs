//! Scroll continuation loop
//!
//! Drives one logical query to exhaustion:
//! - submit the query and decode the first page
//! - if the first page came back exactly full (`hit_count == size`), keep
//!   redeeming the latest scroll token with a fixed lease
//! - stop on the first redeemed page with zero hits
//!
//! The continuation trigger compares against the requested page size, not a
//! server "has more" flag, so a result set that is an exact multiple of the
//! page size always costs one trailing empty round. There is no cap on rounds.
//!
//! Any failure aborts the whole call and no partial result is returned.

use crate::aggregate::{aggregate, AggregatedResult};
use crate::error::TrawlError;
use crate::page::{decode_page, Page};
use crate::query::Query;
use crate::transport::{CancellationToken, Transport};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scroll keep-alive requested on every round.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// Error from a resumable fetch, with the last scroll token that produced a
/// good page.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Interrupted {
    #[source]
    pub error: TrawlError,
    pub last_token: Option<String>,
    /// Documents fetched before the failure (discarded)
    pub fetched: usize,
}

impl Interrupted {
    pub fn into_error(self) -> TrawlError {
        self.error
    }
}

/// Per-call state, owned by one fetch and dropped when it returns.
#[derive(Debug, Default)]
struct ContinuationState {
    token: Option<String>,
    pages: Vec<Page>,
    fetched: usize,
    done: bool,
}

impl ContinuationState {
    fn resumed(token: String) -> Self {
        Self {
            token: Some(token),
            ..Self::default()
        }
    }

    fn accept(&mut self, page: Page) {
        if page.scroll_id.is_some() {
            self.token.clone_from(&page.scroll_id);
        }
        self.fetched += page.hit_count();
        self.pages.push(page);
    }

    fn interrupt(&self, error: TrawlError) -> Interrupted {
        Interrupted {
            error,
            last_token: self.token.clone(),
            fetched: self.fetched,
        }
    }
}

pub struct Scroller<'a, T: Transport + ?Sized> {
    transport: &'a T,
    lease: Duration,
    cancel: CancellationToken,
}

impl<'a, T: Transport + ?Sized> Scroller<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            lease: DEFAULT_LEASE,
            cancel: CancellationToken::new(),
        }
    }

    /// Server-side validity of each scroll token (independent of the request timeout).
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Fetch every document matching `query` in `index`.
    pub fn fetch_all(&self, index: &str, query: &Query) -> crate::Result<AggregatedResult> {
        self.fetch_all_resumable(index, query)
            .map_err(Interrupted::into_error)
    }

    /// Like [`Self::fetch_all`], but a failure also reports the last good
    /// scroll token so the caller can [`Self::resume`] from it.
    pub fn fetch_all_resumable(
        &self,
        index: &str,
        query: &Query,
    ) -> Result<AggregatedResult, Interrupted> {
        let mut state = ContinuationState::default();

        if self.cancel.is_cancelled() {
            return Err(state.interrupt(TrawlError::Cancelled));
        }

        let first = self
            .transport
            .submit(index, query, self.lease)
            .and_then(|raw| decode_page(&raw))
            .map_err(|e| state.interrupt(e))?;

        let page_size = query.size();
        let full = first.hit_count() == page_size;
        debug!(
            index,
            round = 1,
            hits = first.hit_count(),
            page_size,
            "first page"
        );
        state.accept(first);

        if full {
            if state.token.is_none() {
                return Err(state.interrupt(TrawlError::decode("_scroll_id")));
            }
            self.drain(&mut state)?;
        }

        let result = aggregate(state.pages);
        info!(
            index,
            rounds = result.rounds,
            documents = result.len(),
            total = result.total.value,
            "scroll complete"
        );
        Ok(result)
    }

    /// Continue a scroll from a previously issued token until exhaustion.
    ///
    /// The total comes from the first resumed page, which the server may omit.
    pub fn resume(&self, token: impl Into<String>) -> Result<AggregatedResult, Interrupted> {
        let mut state = ContinuationState::resumed(token.into());
        self.drain(&mut state)?;
        Ok(aggregate(state.pages))
    }

    fn drain(&self, state: &mut ContinuationState) -> Result<(), Interrupted> {
        while !state.done {
            let Some(token) = state.token.clone() else {
                return Err(state.interrupt(TrawlError::decode("_scroll_id")));
            };

            if self.cancel.is_cancelled() {
                if let Err(e) = self.transport.release(&token) {
                    warn!(error = %e, "failed to release scroll after cancellation");
                }
                return Err(state.interrupt(TrawlError::Cancelled));
            }

            let page = self
                .transport
                .redeem(&token, self.lease)
                .and_then(|raw| decode_page(&raw))
                .map_err(|e| state.interrupt(e))?;

            debug!(
                round = state.pages.len() + 1,
                hits = page.hit_count(),
                "scroll page"
            );
            state.done = page.hit_count() == 0;
            state.accept(page);
        }
        Ok(())
    }
}

/// Fetch every document matching `query` with the default lease.
pub fn fetch_all<T: Transport + ?Sized>(
    transport: &T,
    index: &str,
    query: &Query,
) -> crate::Result<AggregatedResult> {
    Scroller::new(transport).fetch_all(index, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TotalHits;
    use crate::page::RawResponse;
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Submit { index: String, size: usize },
        Redeem { token: String, lease: Duration },
        Release { token: String },
    }

    /// In-memory engine serving `docs` documents through scroll tokens.
    struct FakeEngine {
        docs: usize,
        cursor: Cell<usize>,
        page_size: Cell<usize>,
        issued: Cell<usize>,
        calls: RefCell<Vec<Call>>,
        /// (call number, response) replacing the normal reply
        override_call: Option<(usize, RawResponse)>,
        /// (call number, error) returned instead of a reply
        fail_call: Option<(usize, fn() -> TrawlError)>,
        /// cancel this token once the given call number completes
        cancel_after: Option<(usize, CancellationToken)>,
        omit_scroll_id: bool,
    }

    impl FakeEngine {
        fn new(docs: usize) -> Self {
            Self {
                docs,
                cursor: Cell::new(0),
                page_size: Cell::new(0),
                issued: Cell::new(0),
                calls: RefCell::new(Vec::new()),
                override_call: None,
                fail_call: None,
                cancel_after: None,
                omit_scroll_id: false,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn current_token(&self) -> String {
            format!("scroll-{}", self.issued.get())
        }

        fn next_page(&self, with_total: bool) -> RawResponse {
            let start = self.cursor.get();
            let end = (start + self.page_size.get()).min(self.docs);
            self.cursor.set(end);
            self.issued.set(self.issued.get() + 1);

            let hits: Vec<Value> = (start..end)
                .map(|i| json!({ "_index": "nba", "_id": format!("doc-{i}"), "_source": { "n": i } }))
                .collect();
            let mut body = json!({ "hits": { "hits": hits } });
            body["hits"]["total"] = if with_total {
                json!({ "value": self.docs, "relation": "eq" })
            } else {
                // continuation pages may carry a stale total
                json!({ "value": 999_999, "relation": "gte" })
            };
            if !self.omit_scroll_id {
                body["_scroll_id"] = json!(self.current_token());
            }
            RawResponse::new(200, body.to_string())
        }

        fn reply(&self, normal: impl FnOnce() -> RawResponse) -> crate::Result<RawResponse> {
            let n = self.call_count();
            if let Some((_, token)) = self.cancel_after.as_ref().filter(|(at, _)| *at == n) {
                token.cancel();
            }
            if let Some((_, make_err)) = self.fail_call.filter(|(at, _)| *at == n) {
                return Err(make_err());
            }
            if let Some((_, raw)) = self.override_call.as_ref().filter(|(at, _)| *at == n) {
                return Ok(raw.clone());
            }
            Ok(normal())
        }
    }

    impl Transport for FakeEngine {
        fn submit(&self, index: &str, query: &Query, _lease: Duration) -> crate::Result<RawResponse> {
            self.calls.borrow_mut().push(Call::Submit {
                index: index.to_string(),
                size: query.size(),
            });
            self.page_size.set(query.size());
            self.reply(|| self.next_page(true))
        }

        fn redeem(&self, token: &str, lease: Duration) -> crate::Result<RawResponse> {
            self.calls.borrow_mut().push(Call::Redeem {
                token: token.to_string(),
                lease,
            });
            if token != self.current_token() {
                return Ok(RawResponse::new(
                    404,
                    json!({ "error": { "type": "search_context_missing_exception", "reason": "No search context found" } })
                        .to_string(),
                ));
            }
            self.reply(|| self.next_page(false))
        }

        fn release(&self, token: &str) -> crate::Result<()> {
            self.calls.borrow_mut().push(Call::Release {
                token: token.to_string(),
            });
            Ok(())
        }
    }

    fn sized(n: usize) -> Query {
        Query::builder().size(n).build()
    }

    #[test]
    fn test_fewer_than_page_size_single_request() {
        let engine = FakeEngine::new(7);
        let result = fetch_all(&engine, "nba", &sized(20)).unwrap();
        assert_eq!(engine.call_count(), 1);
        assert_eq!(result.len(), 7);
        assert_eq!(result.rounds, 1);
        assert_eq!(result.total, TotalHits::exact(7));
    }

    #[test]
    fn test_empty_result_set() {
        let engine = FakeEngine::new(0);
        let result = fetch_all(&engine, "nba", &Query::match_all()).unwrap();
        assert_eq!(engine.call_count(), 1);
        assert!(result.is_empty());
        assert_eq!(result.total.value, 0);
    }

    #[test]
    fn test_forty_five_documents_four_rounds() {
        let engine = FakeEngine::new(45);
        let result = fetch_all(&engine, "nba", &sized(20)).unwrap();

        assert_eq!(engine.call_count(), 4);
        assert_eq!(result.rounds, 4);
        assert_eq!(result.len(), 45);
        assert_eq!(result.total, TotalHits::exact(45));

        let ids: Vec<_> = result.documents.iter().map(|d| d.id.clone()).collect();
        let expected: Vec<_> = (0..45).map(|i| format!("doc-{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_exact_multiple_costs_trailing_empty_round() {
        for (docs, size) in [(20, 20), (40, 20), (9, 3), (1, 1)] {
            let engine = FakeEngine::new(docs);
            let result = fetch_all(&engine, "nba", &sized(size)).unwrap();
            assert_eq!(engine.call_count(), docs.div_ceil(size) + 1, "docs={docs} size={size}");
            assert_eq!(result.len(), docs);
        }
    }

    #[test]
    fn test_same_result_for_any_page_size() {
        for size in [1, 2, 5, 10, 19, 20, 21, 100] {
            let engine = FakeEngine::new(20);
            let result = fetch_all(&engine, "nba", &sized(size)).unwrap();
            assert_eq!(result.len(), 20, "size={size}");
            assert_eq!(result.total, TotalHits::exact(20), "size={size}");
        }
    }

    #[test]
    fn test_redeems_latest_token_with_fixed_lease() {
        let engine = FakeEngine::new(25);
        let lease = Duration::from_secs(30);
        Scroller::new(&engine)
            .with_lease(lease)
            .fetch_all("players", &sized(10))
            .unwrap();

        let calls = engine.calls.borrow();
        assert_eq!(
            calls[0],
            Call::Submit {
                index: "players".to_string(),
                size: 10
            }
        );
        let redeemed: Vec<_> = calls[1..]
            .iter()
            .map(|c| match c {
                Call::Redeem { token, lease: l } => {
                    assert_eq!(*l, lease);
                    token.clone()
                }
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(redeemed, vec!["scroll-1", "scroll-2", "scroll-3"]);
    }

    #[test]
    fn test_decode_failure_mid_scroll() {
        let mut engine = FakeEngine::new(45);
        engine.override_call = Some((
            2,
            RawResponse::new(200, json!({ "_scroll_id": "x", "hits": "oops" }).to_string()),
        ));
        let err = fetch_all(&engine, "nba", &sized(20)).unwrap_err();
        assert!(matches!(err, TrawlError::Decode { ref field } if field == "hits"));
        assert_eq!(engine.call_count(), 2);
    }

    #[test]
    fn test_remote_error_on_first_request() {
        let mut engine = FakeEngine::new(45);
        engine.override_call = Some((
            1,
            RawResponse::new(
                404,
                json!({ "error": { "type": "index_not_found_exception", "reason": "no such index [nba]" } })
                    .to_string(),
            ),
        ));
        let err = fetch_all(&engine, "nba", &sized(20)).unwrap_err();
        assert!(matches!(err, TrawlError::Remote { status: 404, .. }));
    }

    #[test]
    fn test_remote_error_mid_scroll() {
        let mut engine = FakeEngine::new(45);
        engine.override_call = Some((
            2,
            RawResponse::new(
                500,
                json!({ "error": { "type": "search_context_missing_exception", "reason": "No search context found" } })
                    .to_string(),
            ),
        ));
        match fetch_all(&engine, "nba", &sized(20)).unwrap_err() {
            TrawlError::Remote { status, kind, .. } => {
                assert_eq!(status, 500);
                assert_eq!(kind, "search_context_missing_exception");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        assert_eq!(engine.call_count(), 2);
    }

    #[test]
    fn test_transport_failure_not_retried() {
        let mut engine = FakeEngine::new(45);
        engine.fail_call = Some((3, || TrawlError::Timeout(Duration::from_secs(10))));
        let err = fetch_all(&engine, "nba", &sized(20)).unwrap_err();
        assert!(matches!(err, TrawlError::Timeout(_)));
        assert_eq!(engine.call_count(), 3);
    }

    #[test]
    fn test_resumable_reports_last_good_token() {
        let mut engine = FakeEngine::new(45);
        engine.fail_call = Some((3, || TrawlError::transport("connection reset")));
        let interrupted = Scroller::new(&engine)
            .fetch_all_resumable("nba", &sized(20))
            .unwrap_err();
        assert!(interrupted.error.is_transport());
        assert_eq!(interrupted.last_token.as_deref(), Some("scroll-2"));
        assert_eq!(interrupted.fetched, 40);

        engine.fail_call = None;
        let rest = Scroller::new(&engine).resume("scroll-2").unwrap();
        assert_eq!(rest.len(), 5);
        assert_eq!(rest.rounds, 2);
    }

    #[test]
    fn test_full_first_page_without_token() {
        let mut engine = FakeEngine::new(30);
        engine.omit_scroll_id = true;
        let err = fetch_all(&engine, "nba", &sized(10)).unwrap_err();
        assert!(matches!(err, TrawlError::Decode { ref field } if field == "_scroll_id"));
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn test_cancel_before_start() {
        let engine = FakeEngine::new(45);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Scroller::new(&engine)
            .with_cancellation(cancel)
            .fetch_all("nba", &sized(20))
            .unwrap_err();
        assert!(matches!(err, TrawlError::Cancelled));
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn test_cancel_mid_scroll_releases_token() {
        let cancel = CancellationToken::new();
        let mut engine = FakeEngine::new(100);
        engine.cancel_after = Some((2, cancel.clone()));
        let err = Scroller::new(&engine)
            .with_cancellation(cancel)
            .fetch_all("nba", &sized(20))
            .unwrap_err();
        assert!(matches!(err, TrawlError::Cancelled));

        let calls = engine.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[2],
            Call::Release {
                token: "scroll-2".to_string()
            }
        );
    }
}
