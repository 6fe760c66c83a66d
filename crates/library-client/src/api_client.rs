//! HTTP-backed library client
//!
//! [`ApiClient::request`] is the single path every backend call takes:
//!
//! 1. an identical in-flight request (same [`RequestKey`]) is cancelled
//! 2. `GET` requests are answered from the cache when fresh enough
//! 3. the request is sent, retrying transient failures on a fixed delay
//!    schedule
//! 4. successful `GET` responses are cached
//!
//! Cancelled requests never write to the cache.

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use library_config::AppConfig;

use crate::cache::{CacheStats, RequestKey, ResponseCache};
use crate::client::LibraryClient;
use crate::error::ApiError;
use crate::transport::{HttpRequest, Method, ReqwestTransport, Transport};
use crate::types::{
    Book, BookQuery, Collection, EntityPatch, Loan, NewBook, NewLoan, NewUser, SearchFilters,
    SearchResults, StatsUpdate, User,
};

/// Default maximum age of cached GET responses
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// Statistics change often; they are cached for a shorter time
pub const STATISTICS_CACHE_TIME: Duration = Duration::from_secs(2 * 60);

/// Default delays between attempts
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(1000),
    Duration::from_millis(2000),
    Duration::from_millis(4000),
];

/// Per-request options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// JSON body; ignored for `GET`
    pub body: Option<Value>,
    /// Extra headers, sent after `Content-Type`
    pub headers: Vec<(String, String)>,
    /// Overrides the client's cache max age for this `GET`
    pub cache_time: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            body,
            ..Self::default()
        }
    }

    pub fn put(body: Value) -> Self {
        Self {
            method: Method::Put,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::Delete,
            ..Self::default()
        }
    }

    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = Some(cache_time);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

struct InFlight {
    id: u64,
    token: CancellationToken,
}

/// Removes the in-flight entry when the request ends, however it ends
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<RequestKey, InFlight>>,
    key: RequestKey,
    id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&self.key).is_some_and(|f| f.id == self.id) {
            in_flight.remove(&self.key);
        }
    }
}

/// Library backend client with caching, retry and cancellation
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    cache: Mutex<ResponseCache>,
    in_flight: Mutex<HashMap<RequestKey, InFlight>>,
    next_request_id: AtomicU64,
    retry_delays: Vec<Duration>,
    cache_time: Duration,
}

impl ApiClient {
    /// Create a client with default cache time and retry schedule
    ///
    /// `base_url` is prefixed verbatim to every endpoint, e.g.
    /// `http://localhost:8080/api`.
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            cache: Mutex::new(ResponseCache::new()),
            in_flight: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(0),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            cache_time: DEFAULT_CACHE_TIME,
        }
    }

    /// Create a `reqwest`-backed client from the application config
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(config.base_url.clone(), Arc::new(transport))
            .with_cache_time(config.cache_time())
            .with_retry_delays(config.retry_delays()))
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a request against `endpoint` (path relative to the base URL)
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let method = options.method;
        let url = format!("{}{}", self.base_url, endpoint);
        let body = match &options.body {
            Some(body) if method != Method::Get => Some(serde_json::to_string(body)?),
            _ => None,
        };

        let key = RequestKey::new(method, url.clone(), body.clone());
        let (_guard, token) = self.begin(&key);

        let max_age = options.cache_time.unwrap_or(self.cache_time);
        if method == Method::Get {
            let cached = self.cache.lock().get(&key, max_age);
            if let Some(cached) = cached {
                debug!("Cache HIT for {}", key);
                return Ok(cached);
            }
            debug!("Cache MISS for {}", key);
        }

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(options.headers);
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        let value = self.send_with_retry(&request, &token).await?;

        if method == Method::Get {
            let mut cache = self.cache.lock();
            if token.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            cache.insert(key, value.clone(), max_age);
        }

        Ok(value)
    }

    /// Register a request as in flight, cancelling an identical predecessor
    fn begin(&self, key: &RequestKey) -> (InFlightGuard<'_>, CancellationToken) {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self.in_flight.lock().insert(
            key.clone(),
            InFlight {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!("Cancelling previous in-flight request {}", key);
            previous.token.cancel();
        }

        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            key: key.clone(),
            id,
        };
        (guard, token)
    }

    async fn send_with_retry(
        &self,
        request: &HttpRequest,
        token: &CancellationToken,
    ) -> Result<Value, ApiError> {
        let mut attempt = 0;
        loop {
            if attempt == 0 {
                debug!("{} {}", request.method, request.url);
            } else {
                debug!("{} {} (retry {})", request.method, request.url, attempt);
            }

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Cancelled),
                result = self.send_once(request) => result,
            };

            let error = match outcome {
                Ok(_) if token.is_cancelled() => return Err(ApiError::Cancelled),
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            let Some(delay) = self.retry_delays.get(attempt).copied() else {
                warn!(
                    "{} {} failed after {} attempts: {}",
                    request.method,
                    request.url,
                    attempt + 1,
                    error
                );
                return Err(error);
            };

            warn!(
                "{} {} failed: {}, retrying in {:?}",
                request.method, request.url, error, delay
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<Value, ApiError> {
        let response = self.transport.send(request.clone()).await?;

        if !response.is_success() {
            return Err(ApiError::from_response(
                response.status,
                &response.status_text,
                &response.body,
            ));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request(endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        debug!("API cache cleared");
    }

    /// Cancel every request currently in flight
    pub fn cancel_all_requests(&self) {
        let mut in_flight = self.in_flight.lock();
        for (_, request) in in_flight.drain() {
            request.token.cancel();
        }
        debug!("All requests cancelled");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

fn json_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

#[async_trait]
impl LibraryClient for ApiClient {
    async fn get_books(&self, query: &BookQuery) -> Result<Collection<Book>, ApiError> {
        let qs = query.to_query_string();
        let endpoint = if qs.is_empty() {
            "/books".to_string()
        } else {
            format!("/books?{}", qs)
        };
        self.fetch(&endpoint, RequestOptions::get()).await
    }

    async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
        self.fetch(&format!("/books/{}", id), RequestOptions::get())
            .await
    }

    async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        self.fetch("/books", RequestOptions::post(Some(json_body(book)?)))
            .await
    }

    async fn update_book(&self, id: &str, updates: &EntityPatch) -> Result<Book, ApiError> {
        self.fetch(
            &format!("/books/{}", id),
            RequestOptions::put(json_body(&updates.fields)?),
        )
        .await
    }

    async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
        self.request(&format!("/books/{}", id), RequestOptions::delete())
            .await?;
        Ok(())
    }

    async fn get_users(&self) -> Result<Collection<User>, ApiError> {
        self.fetch("/users", RequestOptions::get()).await
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.fetch(&format!("/users/{}", id), RequestOptions::get())
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.fetch("/users", RequestOptions::post(Some(json_body(user)?)))
            .await
    }

    async fn update_user(&self, id: &str, updates: &EntityPatch) -> Result<User, ApiError> {
        self.fetch(
            &format!("/users/{}", id),
            RequestOptions::put(json_body(&updates.fields)?),
        )
        .await
    }

    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.request(&format!("/users/{}", id), RequestOptions::delete())
            .await?;
        Ok(())
    }

    async fn get_loans(&self) -> Result<Collection<Loan>, ApiError> {
        self.fetch("/loans", RequestOptions::get()).await
    }

    async fn get_loan(&self, id: &str) -> Result<Loan, ApiError> {
        self.fetch(&format!("/loans/{}", id), RequestOptions::get())
            .await
    }

    async fn create_loan(&self, loan: &NewLoan) -> Result<Loan, ApiError> {
        self.fetch("/loans", RequestOptions::post(Some(json_body(loan)?)))
            .await
    }

    async fn return_loan(&self, id: &str) -> Result<Loan, ApiError> {
        self.fetch(&format!("/loans/{}/return", id), RequestOptions::post(None))
            .await
    }

    async fn search(
        &self,
        q: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, ApiError> {
        let endpoint = format!("/search?{}", filters.to_query_string(q));
        self.fetch(&endpoint, RequestOptions::get()).await
    }

    async fn get_statistics(&self) -> Result<StatsUpdate, ApiError> {
        self.fetch(
            "/statistics",
            RequestOptions::get().with_cache_time(STATISTICS_CACHE_TIME),
        )
        .await
    }
}
