//! Month-keyed store for the calendar's raw data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use metrics::counter;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::application::repos::{CalendarRepo, RepoError};
use crate::domain::calendar::YearMonth;
use crate::domain::promotions::{CalendarSettingsRecord, PromotionRecord};

use super::clock::Clock;
use super::config::CacheConfig;
use super::keys::CALENDAR_DATA_TAG;
use super::lock::{rw_read, rw_write};
use super::registry::TagRegistry;

const SOURCE: &str = "cache::store";

const METRIC_HIT: &str = "promocal_calendar_cache_hit_total";
const METRIC_MISS: &str = "promocal_calendar_cache_miss_total";
const METRIC_INVALIDATE: &str = "promocal_calendar_cache_invalidate_total";

/// Everything the page needs from storage for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarData {
    pub weekly_defaults: Vec<PromotionRecord>,
    pub weekly_plan: Vec<PromotionRecord>,
    pub specials: Vec<PromotionRecord>,
    pub settings: Option<CalendarSettingsRecord>,
}

struct CacheEntry {
    data: Arc<CalendarData>,
    stored_at: OffsetDateTime,
}

/// Memoizes [`CalendarData`] per month.
///
/// An entry is served while younger than the TTL. Invalidating
/// [`CALENDAR_DATA_TAG`] drops every entry, and a fetch that started before
/// the invalidation is returned to its caller but never stored.
pub struct CalendarDataCache {
    repo: Arc<dyn CalendarRepo>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<YearMonth, CacheEntry>>,
    registry: TagRegistry<YearMonth>,
    epoch: AtomicU64,
}

impl CalendarDataCache {
    pub fn new(repo: Arc<dyn CalendarRepo>, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        let ttl = Duration::seconds(i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX));
        Self {
            repo,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
            registry: TagRegistry::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Return the data for `key`, reading through to the repository on a miss.
    ///
    /// Repository failures are propagated and leave the store untouched.
    pub async fn get(&self, key: YearMonth) -> Result<Arc<CalendarData>, RepoError> {
        if let Some(data) = self.lookup(key) {
            counter!(METRIC_HIT).increment(1);
            debug!(
                year = key.year,
                month = key.month,
                "Calendar data cache hit"
            );
            return Ok(data);
        }

        counter!(METRIC_MISS).increment(1);
        let epoch = self.epoch.load(Ordering::Acquire);
        let data = Arc::new(self.fetch(key).await?);
        self.store(key, Arc::clone(&data), epoch);
        Ok(data)
    }

    /// Drop every entry registered under `tag`; returns how many were dropped.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_tag");
        self.epoch.fetch_add(1, Ordering::AcqRel);

        let keys = self.registry.take_tag(tag);
        let mut dropped = 0;
        for key in keys {
            if entries.remove(&key).is_some() {
                dropped += 1;
            }
        }

        counter!(METRIC_INVALIDATE).increment(1);
        info!(
            tag,
            dropped,
            "Calendar data cache invalidated"
        );
        dropped
    }

    /// Whether entries of this store are ever registered under `tag`.
    pub fn declares_tag(&self, tag: &str) -> bool {
        tag == CALENDAR_DATA_TAG
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: YearMonth) -> Option<Arc<CalendarData>> {
        let now = self.clock.now();
        let entries = rw_read(&self.entries, SOURCE, "lookup");
        entries
            .get(&key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| Arc::clone(&entry.data))
    }

    fn is_fresh(&self, entry: &CacheEntry, now: OffsetDateTime) -> bool {
        now - entry.stored_at < self.ttl
    }

    async fn fetch(&self, key: YearMonth) -> Result<CalendarData, RepoError> {
        let year = key.year;
        let month = key.month_i32();
        let (weekly_defaults, weekly_plan, specials, settings) = tokio::try_join!(
            self.repo.list_weekly_defaults(),
            self.repo.list_weekly_plan(year, month),
            self.repo.list_active_specials(year, month),
            self.repo.load_calendar_settings(),
        )?;

        Ok(CalendarData {
            weekly_defaults,
            weekly_plan,
            specials,
            settings,
        })
    }

    fn store(&self, key: YearMonth, data: Arc<CalendarData>, epoch: u64) {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "store");
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(
                year = key.year,
                month = key.month,
                "Discarding calendar data fetched before invalidation"
            );
            return;
        }

        let expired: Vec<YearMonth> = entries
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry, now))
            .map(|(key, _)| *key)
            .collect();
        for stale in expired {
            entries.remove(&stale);
            self.registry.unregister(&stale);
        }

        entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
            },
        );
        self.registry.register(key, [CALENDAR_DATA_TAG]);
    }
}
