//! Test utilities: mock implementations of the core collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::CrawlResult;
use crate::store::MemoryStore;
use crate::traits::{Fetcher, LinkChecker, ResultStore};

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// Counts concurrent calls and remembers the peak.
#[derive(Clone, Default)]
pub struct InFlight {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

pub struct InFlightGuard {
    current: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn enter(&self) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            current: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

enum Response {
    Page(String),
    Error(Option<AppError>),
}

/// Mock fetcher serving pages from an in-memory map keyed by URL.
///
/// Unknown URLs fail with a network error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    gate: Option<Arc<Semaphore>>,
    pub in_flight: InFlight,
    pub fetched: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Page(html.to_string()));
        self
    }

    /// Fail the next fetch of `url` with `error`.
    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Error(Some(error)));
        self
    }

    /// Block every fetch until the semaphore hands out a permit.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let _guard = self.in_flight.enter();
        self.fetched.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| AppError::Generic(e.to_string()))?;
        }

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(url) {
            Some(Response::Page(html)) => Ok(html.clone()),
            Some(Response::Error(err)) => Err(err
                .take()
                .unwrap_or_else(|| AppError::NetworkError(format!("{url} already failed")))),
            None => Err(AppError::NetworkError(format!("no route to {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockLinkChecker
// ---------------------------------------------------------------------------

/// Mock link checker answering 200 unless told otherwise.
#[derive(Clone, Default)]
pub struct MockLinkChecker {
    statuses: Arc<Mutex<HashMap<String, u16>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    checked: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    in_flight: InFlight,
}

impl MockLinkChecker {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(url.to_string(), status);
        self
    }

    /// Make checks of `url` fail at the transport level.
    pub fn with_error(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.in_flight.peak()
    }
}

impl LinkChecker for MockLinkChecker {
    async fn check(&self, url: &str) -> Result<u16, AppError> {
        let _guard = self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.checked.lock().unwrap().push(url.to_string());

        if self.failing.lock().unwrap().contains(url) {
            return Err(AppError::NetworkError(format!("connection reset by {url}")));
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(200))
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store that records every update and can fail on demand.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: MemoryStore,
    /// Every record passed to `update`, in call order.
    pub updates: Arc<Mutex<Vec<CrawlResult>>>,
    create_error: Arc<Mutex<Option<AppError>>>,
    get_error: Arc<Mutex<Option<AppError>>>,
    /// Successful updates still allowed before the injected error fires.
    update_error: Arc<Mutex<Option<(usize, AppError)>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fail the next `create` call.
    pub fn with_create_error(self, error: AppError) -> Self {
        *self.create_error.lock().unwrap() = Some(error);
        self
    }

    /// Fail the next `get` call.
    pub fn with_get_error(self, error: AppError) -> Self {
        *self.get_error.lock().unwrap() = Some(error);
        self
    }

    /// Fail the next `update` call.
    pub fn with_update_error(self, error: AppError) -> Self {
        self.with_update_error_after(0, error)
    }

    /// Let `successes` updates through, then fail the one after.
    pub fn with_update_error_after(self, successes: usize, error: AppError) -> Self {
        *self.update_error.lock().unwrap() = Some((successes, error));
        self
    }

    /// Insert a record directly, bypassing failure injection.
    pub async fn seed(&self, result: &CrawlResult) -> Uuid {
        self.inner.create(result).await.unwrap()
    }

    pub fn records(&self) -> Vec<CrawlResult> {
        self.inner.all().unwrap()
    }
}

impl ResultStore for MockStore {
    async fn create(&self, result: &CrawlResult) -> Result<Uuid, AppError> {
        if let Some(e) = self.create_error.lock().unwrap().take() {
            return Err(e);
        }
        self.inner.create(result).await
    }

    async fn get(&self, id: Uuid) -> Result<CrawlResult, AppError> {
        if let Some(e) = self.get_error.lock().unwrap().take() {
            return Err(e);
        }
        self.inner.get(id).await
    }

    async fn update(&self, result: &CrawlResult) -> Result<(), AppError> {
        {
            let mut pending = self.update_error.lock().unwrap();
            let fire = match pending.as_mut() {
                Some((0, _)) => true,
                Some((successes, _)) => {
                    *successes -= 1;
                    false
                }
                None => false,
            };
            if fire {
                if let Some((_, e)) = pending.take() {
                    return Err(e);
                }
            }
        }
        self.updates.lock().unwrap().push(result.clone());
        self.inner.update(result).await
    }
}
