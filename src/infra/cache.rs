use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::application::calendar::ResolvedParams;
use crate::cache::{CacheConfig, Clock, rw_read, rw_write};

const SOURCE: &str = "infra::cache::ResponseCache";
const METRIC_HIT: &str = "promocal_response_cache_hit_total";
const METRIC_EVICT: &str = "promocal_response_cache_evict_total";

/// Rendered page identity: the route plus the parameters it resolved to.
///
/// Raw query strings never reach the key, so unknown parameters and
/// out-of-range values share the entry of the page they fall back to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub params: ResolvedParams,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, params: ResolvedParams) -> Self {
        Self {
            path: path.into(),
            params,
        }
    }
}

/// In-memory LRU cache of rendered page output.
///
/// Entries live for the configured TTL unless their path is invalidated
/// first. Every invalidation bumps an epoch; output rendered under an older
/// epoch is handed back to its caller but never stored.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<LruCache<ResponseKey, CachedResponse>>>,
    epoch: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(config.response_limit_non_zero()))),
            epoch: Arc::new(AtomicU64::new(0)),
            clock,
            ttl: Duration::seconds(i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX)),
        }
    }

    /// Current invalidation epoch. Capture it before loading the data a page
    /// is rendered from.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &ResponseKey) -> Option<Response<Body>> {
        let now = self.clock.now();
        let mut guard = rw_write(&self.entries, SOURCE, "get");
        let fresh = guard
            .get(key)
            .map(|cached| now - cached.stored_at < self.ttl)?;
        if !fresh {
            guard.pop(key);
            return None;
        }

        counter!(METRIC_HIT).increment(1);
        guard.get(key).cloned().map(CachedResponse::into_response)
    }

    /// Store `response` unless the cache was invalidated after `epoch`.
    pub fn put(&self, key: ResponseKey, response: CachedResponse, epoch: u64) -> bool {
        let mut guard = rw_write(&self.entries, SOURCE, "put");
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(path = %key.path, "Discarding page rendered before invalidation");
            return false;
        }
        if let Some((evicted, _)) = guard.push(key.clone(), response) {
            if evicted != key {
                counter!(METRIC_EVICT).increment(1);
            }
        }
        true
    }

    /// Buffer `response`, store it under `key`, and hand back an equivalent response.
    pub async fn store_response(
        &self,
        key: ResponseKey,
        response: Response,
        epoch: u64,
    ) -> Result<Response, (Response, CacheStoreError)> {
        let stored_at = self.clock.now();
        let (rebuilt, cached) = buffer_response(response, stored_at).await?;
        self.put(key, cached, epoch);
        Ok(rebuilt)
    }

    /// Drop every cached variant of `path`; returns how many were dropped.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let mut guard = rw_write(&self.entries, SOURCE, "invalidate_path");
        self.epoch.fetch_add(1, Ordering::AcqRel);

        let doomed: Vec<ResponseKey> = guard
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            guard.pop(key);
        }

        let dropped = doomed.len();
        info!(path, dropped, "Response cache path invalidated");
        dropped
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    stored_at: OffsetDateTime,
}

impl CachedResponse {
    pub fn new(
        status: StatusCode,
        headers: &HeaderMap,
        body: Bytes,
        stored_at: OffsetDateTime,
    ) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers,
            body,
            stored_at,
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only successful responses that set no cookie are worth replaying.
pub fn should_store_response(response: &Response) -> bool {
    response.status().is_success() && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
    stored_at: OffsetDateTime,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached =
                CachedResponse::new(parts.status, &parts.headers, bytes.clone(), stored_at);
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
