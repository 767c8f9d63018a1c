//! Scripted fetcher and recording observer shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use data_flux_client::{FetchError, PageFetcher, PageQuery};
use data_flux_ingest_models::RunSummary;
use data_flux_schema::ValidationFailure;
use data_flux_schema_models::{Endpoint, PageEnvelope};
use serde_json::{Value, json};

use crate::observer::IngestObserver;

/// Builds a valid `/users` page whose ids continue from earlier pages.
pub fn user_page(page: u64, size: u64, total: u64) -> Value {
    let first = (page - 1) * size + 1;
    let last = (page * size).min(total);
    let items: Vec<Value> = (first..=last)
        .map(|id| json!({ "id": id, "first_name": format!("user-{id}") }))
        .collect();
    json!({
        "total": total,
        "page": page,
        "size": size,
        "pages": total.div_ceil(size),
        "items": items,
    })
}

enum Response {
    Page(Value),
    Fail(u16),
}

/// Serves canned pages; unscripted pages answer HTTP 404.
pub struct ScriptedFetcher {
    responses: Mutex<BTreeMap<u64, Response>>,
    calls: Mutex<Vec<PageQuery>>,
    reverse_latency: bool,
    page_count: u64,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    /// Serves `pages` valid user pages of `size` records out of `total`.
    pub fn users(pages: u64, size: u64, total: u64) -> Self {
        let responses = (1..=pages)
            .map(|page| (page, Response::Page(user_page(page, size, total))))
            .collect();
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
            reverse_latency: false,
            page_count: pages,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Makes earlier pages take longer, so completion order is reversed.
    pub const fn with_reverse_latency(mut self) -> Self {
        self.reverse_latency = true;
        self
    }

    pub fn fail_page(&self, page: u64, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(page, Response::Fail(status));
    }

    pub fn serve_page(&self, page: u64, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(page, Response::Page(body));
    }

    pub fn calls(&self) -> Vec<PageQuery> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, endpoint: Endpoint, query: PageQuery) -> Result<Value, FetchError> {
        let url = format!("http://test{}", endpoint.path());
        match self.responses.lock().unwrap().get(&query.page) {
            Some(Response::Page(body)) => Ok(body.clone()),
            Some(Response::Fail(status)) => Err(FetchError::Status {
                url,
                status: *status,
            }),
            None => Err(FetchError::Status { url, status: 404 }),
        }
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, endpoint: Endpoint, query: PageQuery) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(query);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let yields = if self.reverse_latency {
            self.page_count.saturating_sub(query.page) + 1
        } else {
            1
        };
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.respond(endpoint, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProbeFailed,
    ProbeInvalid,
    Configured { total_records: u64, page_count: u64 },
    PageValidated(u64),
    PageFetchFailed(u64),
    PageInvalid(u64),
    RunComplete,
    Persisted(u64),
}

/// Remembers every event in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl IngestObserver for RecordingObserver {
    fn probe_failed(&self, _endpoint: Endpoint, _error: &FetchError) {
        self.push(Event::ProbeFailed);
    }

    fn probe_invalid(&self, _endpoint: Endpoint, _failure: &ValidationFailure) {
        self.push(Event::ProbeInvalid);
    }

    fn configured(&self, _endpoint: Endpoint, total_records: u64, page_count: u64) {
        self.push(Event::Configured {
            total_records,
            page_count,
        });
    }

    fn page_validated(&self, page: u64, _envelope: &PageEnvelope) {
        self.push(Event::PageValidated(page));
    }

    fn page_fetch_failed(&self, page: u64, _error: &FetchError) {
        self.push(Event::PageFetchFailed(page));
    }

    fn page_invalid(&self, page: u64, _failure: &ValidationFailure) {
        self.push(Event::PageInvalid(page));
    }

    fn run_complete(&self, _summary: &RunSummary) {
        self.push(Event::RunComplete);
    }

    fn persisted(&self, _endpoint: Endpoint, count: u64) {
        self.push(Event::Persisted(count));
    }
}
