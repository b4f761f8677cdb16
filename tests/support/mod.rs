//! Shared fixtures for router-level tests.
#![allow(dead_code)]

use std::sync::{
    Arc, Mutex, RwLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header::COOKIE},
    response::Response,
};
use chrono_tz::Tz;
use http_body_util::BodyExt;
use time::macros::datetime;
use tokio::sync::Notify;
use tower::ServiceExt;

use promocal::{
    application::{
        calendar::{CalendarService, DEFAULT_BACKGROUND},
        repos::{CalendarRepo, HealthRepo, RepoError},
        revalidate::{CacheInvalidator, Revalidator},
    },
    cache::{CacheConfig, CalendarDataCache, Clock, ManualClock},
    domain::promotions::{
        CalendarSettingsRecord, PromotionRecord, PromotionTranslation, Translations,
    },
    infra::{
        cache::ResponseCache,
        http::{AdminState, HttpState, RouterState, build_router},
    },
};

pub const ADMIN_SESSION: &str = "admin_auth=session";

/// Holds a weekly-defaults read open until released.
#[derive(Clone, Default)]
pub struct ReadPause {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct FixtureRepo {
    pub weekly_defaults: RwLock<Vec<PromotionRecord>>,
    pub weekly_plan: Vec<PromotionRecord>,
    pub specials: Vec<PromotionRecord>,
    pub bg_image_url: Option<String>,
    pub any_active_special: AtomicBool,
    pub healthy: bool,
    pub fail_reads: AtomicBool,
    pub default_reads: AtomicUsize,
    defaults_pause: Mutex<Option<ReadPause>>,
}

impl FixtureRepo {
    pub fn new(any_active_special: bool) -> Self {
        Self {
            weekly_defaults: RwLock::new(vec![
                weekly(1, "Monday deal", true),
                weekly(2, "Hidden Tuesday", false),
            ]),
            weekly_plan: Vec::new(),
            specials: vec![special(2024, 0, 15, "Mid-month special")],
            bg_image_url: None,
            any_active_special: AtomicBool::new(any_active_special),
            healthy: true,
            fail_reads: AtomicBool::new(false),
            default_reads: AtomicUsize::new(0),
            defaults_pause: Mutex::new(None),
        }
    }

    pub fn default_reads(&self) -> usize {
        self.default_reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_active_special(&self, active: bool) {
        self.any_active_special.store(active, Ordering::SeqCst);
    }

    pub fn set_weekly_defaults(&self, rows: Vec<PromotionRecord>) {
        *self.weekly_defaults.write().expect("weekly defaults") = rows;
    }

    /// Make the next weekly-defaults read wait, after it has read its rows,
    /// until the returned pause is released.
    pub fn pause_next_defaults_read(&self) -> ReadPause {
        let pause = ReadPause::default();
        *self.defaults_pause.lock().expect("defaults pause") = Some(pause.clone());
        pause
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(RepoError::from_persistence("connection reset"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CalendarRepo for FixtureRepo {
    async fn list_weekly_defaults(&self) -> Result<Vec<PromotionRecord>, RepoError> {
        self.check()?;
        self.default_reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.weekly_defaults.read().expect("weekly defaults").clone();

        let pause = self.defaults_pause.lock().expect("defaults pause").take();
        if let Some(pause) = pause {
            pause.reached.notify_one();
            pause.release.notified().await;
        }
        Ok(rows)
    }

    async fn list_weekly_plan(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError> {
        self.check()?;
        Ok(self
            .weekly_plan
            .iter()
            .filter(|row| row.year == Some(year) && row.month == Some(month))
            .cloned()
            .collect())
    }

    async fn list_active_specials(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError> {
        self.check()?;
        Ok(self
            .specials
            .iter()
            .filter(|row| row.active && row.year == Some(year) && row.month == Some(month))
            .cloned()
            .collect())
    }

    async fn load_calendar_settings(&self) -> Result<Option<CalendarSettingsRecord>, RepoError> {
        self.check()?;
        Ok(Some(CalendarSettingsRecord {
            bg_image_url: self.bg_image_url.clone(),
        }))
    }

    async fn has_any_active_special(&self) -> Result<bool, RepoError> {
        self.check()?;
        Ok(self.any_active_special.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl HealthRepo for FixtureRepo {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

fn translated(title: &str, active: bool) -> PromotionRecord {
    let mut translations = Translations::new();
    translations.insert(
        "en",
        PromotionTranslation {
            title: Some(title.to_string()),
            button: Some("Shop".to_string()),
            link: Some("/shop".to_string()),
            ..PromotionTranslation::default()
        },
    );
    PromotionRecord {
        title: Some(format!("{title} (pt)")),
        active,
        translations,
        ..PromotionRecord::default()
    }
}

pub fn weekly(weekday: i16, title: &str, active: bool) -> PromotionRecord {
    PromotionRecord {
        weekday: Some(weekday),
        ..translated(title, active)
    }
}

pub fn special(year: i32, month: i32, day: i32, title: &str) -> PromotionRecord {
    PromotionRecord {
        year: Some(year),
        month: Some(month),
        day: Some(day),
        ..translated(title, true)
    }
}

pub struct Harness {
    pub router: Router,
    pub repo: Arc<FixtureRepo>,
    pub clock: Arc<ManualClock>,
    pub data_cache: Arc<CalendarDataCache>,
    pub response_cache: ResponseCache,
}

impl Harness {
    pub fn new(repo: FixtureRepo) -> Self {
        Self::with_invalidator(repo, |data, responses| {
            Arc::new(Revalidator::new(data, Some(responses))) as Arc<dyn CacheInvalidator>
        })
    }

    pub fn with_invalidator(
        repo: FixtureRepo,
        invalidator: impl FnOnce(Arc<CalendarDataCache>, ResponseCache) -> Arc<dyn CacheInvalidator>,
    ) -> Self {
        let repo = Arc::new(repo);
        let clock = Arc::new(ManualClock::new(datetime!(2025-07-04 12:00 UTC)));
        let config = CacheConfig::default();
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let calendar_repo: Arc<dyn CalendarRepo> = repo.clone();

        let data_cache = Arc::new(CalendarDataCache::new(
            calendar_repo.clone(),
            shared_clock.clone(),
            &config,
        ));
        let response_cache = ResponseCache::new(shared_clock.clone(), &config);
        let calendar = Arc::new(CalendarService::new(
            calendar_repo,
            data_cache.clone(),
            shared_clock,
            Tz::UTC,
            DEFAULT_BACKGROUND,
        ));

        let state = RouterState {
            http: HttpState {
                calendar,
                health: repo.clone(),
                response_cache: Some(response_cache.clone()),
            },
            admin: AdminState {
                invalidator: invalidator(data_cache.clone(), response_cache.clone()),
            },
        };

        Self {
            router: build_router(state),
            repo,
            clock,
            data_cache,
            response_cache,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(get_request(uri)).await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_as_admin(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(COOKIE, ADMIN_SESSION)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}
