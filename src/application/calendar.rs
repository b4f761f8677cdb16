//! Calendar page resolution.
//!
//! Turns the `y`, `m` and `lang` query parameters into an effective month,
//! reads that month through the data cache and normalizes it for display.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono_tz::Tz;
use tracing::debug;

use crate::application::error::HttpError;
use crate::application::repos::{CalendarRepo, RepoError};
use crate::cache::{CalendarDataCache, Clock};
use crate::domain::calendar::{MAX_YEAR, MIN_YEAR, YearMonth};
use crate::domain::language::Language;
use crate::domain::schedule::{SpecialEntry, WeeklySchedule, normalize_specials, normalize_weekly};
use crate::util::timezone::localized_year_month;

const SOURCE: &str = "application::calendar::CalendarService";

pub const YEAR_PARAM: &str = "y";
pub const MONTH_PARAM: &str = "m";
pub const LANG_PARAM: &str = "lang";

pub const DEFAULT_BACKGROUND: &str = "/img/bg-calendar.png";

/// Parameters of a calendar page request, before any fallback is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarRequest {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub lang: Language,
    pub admin_preview: bool,
}

impl CalendarRequest {
    /// Parse a raw query string. When a key repeats, its first value is used.
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut year = None;
        let mut month = None;
        let mut lang = None;

        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                YEAR_PARAM => &mut year,
                MONTH_PARAM => &mut month,
                LANG_PARAM => &mut lang,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        Self {
            year: year.as_deref().and_then(parse_year),
            month: month.as_deref().and_then(parse_month),
            lang: Language::from_query(lang.as_deref()),
            admin_preview: false,
        }
    }

    pub fn with_admin_preview(mut self, admin_preview: bool) -> Self {
        self.admin_preview = admin_preview;
        self
    }
}

/// Lenient base-10 integer parse.
///
/// Leading whitespace and a single sign are accepted, then as many digits as
/// follow; anything after the digits is ignored. Returns `None` when no digit
/// is present or the value does not fit in an `i64`.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for byte in digits[..len].bytes() {
        value = value
            .checked_mul(10)?
            .checked_add(i64::from(byte - b'0'))?;
    }
    Some(if negative { -value } else { value })
}

fn parse_year(raw: &str) -> Option<i32> {
    parse_leading_int(raw)
        .and_then(|value| i32::try_from(value).ok())
        .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
}

fn parse_month(raw: &str) -> Option<u8> {
    parse_leading_int(raw)
        .filter(|month| (0..=11).contains(month))
        .and_then(|month| u8::try_from(month).ok())
}

/// Effective parameters after fallbacks and the navigation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedParams {
    pub year_month: YearMonth,
    pub lang: Language,
    pub show_nav: bool,
}

/// Apply fallbacks, then the navigation gate.
///
/// Year and month fall back to `today` independently. When no special
/// promotion is active anywhere, navigation is hidden and the page is pinned
/// to `today` whatever was requested.
pub fn resolve_params(
    request: &CalendarRequest,
    today: YearMonth,
    has_active_special: bool,
) -> ResolvedParams {
    let year_month = if has_active_special {
        YearMonth {
            year: request.year.unwrap_or(today.year),
            month: request.month.unwrap_or(today.month),
        }
    } else {
        today
    };

    ResolvedParams {
        year_month,
        lang: request.lang,
        show_nav: has_active_special,
    }
}

/// Everything the calendar template renders.
#[derive(Debug, Clone)]
pub struct CalendarPage {
    pub year_month: YearMonth,
    pub lang: Language,
    pub show_nav: bool,
    pub previous: YearMonth,
    pub next: YearMonth,
    pub month_label: &'static str,
    pub weekly: WeeklySchedule,
    pub specials: Vec<SpecialEntry>,
    pub bg_image_url: String,
    pub admin_preview: bool,
}

#[derive(Clone)]
pub struct CalendarService {
    repo: Arc<dyn CalendarRepo>,
    cache: Arc<CalendarDataCache>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    default_background: String,
}

impl CalendarService {
    pub fn new(
        repo: Arc<dyn CalendarRepo>,
        cache: Arc<CalendarDataCache>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        default_background: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            cache,
            clock,
            timezone,
            default_background: default_background.into(),
        }
    }

    /// Month containing the current instant in the site timezone.
    pub fn today(&self) -> YearMonth {
        localized_year_month(self.clock.now(), self.timezone)
    }

    /// Run the any-active-special gate and resolve the effective parameters.
    ///
    /// The gate is read from the repository on every call, never cached.
    pub async fn resolve(&self, request: &CalendarRequest) -> Result<ResolvedParams, HttpError> {
        let has_active_special = self
            .repo
            .has_any_active_special()
            .await
            .map_err(|err| repo_failure("has_any_active_special", err))?;

        let params = resolve_params(request, self.today(), has_active_special);
        debug!(
            year = params.year_month.year,
            month = params.year_month.month,
            lang = %params.lang,
            show_nav = params.show_nav,
            "Resolved calendar request"
        );
        Ok(params)
    }

    /// Assemble the page for already-resolved parameters.
    pub async fn load_resolved(
        &self,
        params: ResolvedParams,
        admin_preview: bool,
    ) -> Result<CalendarPage, HttpError> {
        let ResolvedParams {
            year_month,
            lang,
            show_nav,
        } = params;

        let data = self
            .cache
            .get(year_month)
            .await
            .map_err(|err| repo_failure("calendar_data", err))?;

        let weekly = normalize_weekly(&data.weekly_defaults, &data.weekly_plan, lang);
        let specials = normalize_specials(&data.specials, lang);
        let bg_image_url = data
            .settings
            .as_ref()
            .and_then(|settings| settings.bg_image_url.clone())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.default_background.clone());

        Ok(CalendarPage {
            year_month,
            lang,
            show_nav,
            previous: year_month.previous(),
            next: year_month.next(),
            month_label: year_month.month_label(lang),
            weekly,
            specials,
            bg_image_url,
            admin_preview,
        })
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load calendar",
        format!("{operation} failed: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::cache::{CacheConfig, ManualClock};
    use crate::domain::promotions::{
        CalendarSettingsRecord, PromotionRecord, PromotionTranslation, Translations,
    };

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    #[test]
    fn leading_int_parse_is_lenient() {
        assert_eq!(parse_leading_int("2024"), Some(2024));
        assert_eq!(parse_leading_int("  7abc"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+11"), Some(11));
        assert_eq!(parse_leading_int("1e3"), Some(1));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), None);
    }

    #[test]
    fn query_parsing_applies_ranges_and_first_value() {
        let request = CalendarRequest::from_query(Some("y=2024&m=12&lang=en&y=1999"));
        assert_eq!(request.year, Some(2024));
        assert_eq!(request.month, None);
        assert_eq!(request.lang, Language::En);

        let request = CalendarRequest::from_query(Some("y=abc&m=-1&lang=de"));
        assert_eq!(request.year, None);
        assert_eq!(request.month, None);
        assert_eq!(request.lang, Language::Pt);

        let request = CalendarRequest::from_query(None);
        assert_eq!(request, CalendarRequest::default());
    }

    #[test]
    fn out_of_range_years_are_ignored() {
        let request = CalendarRequest::from_query(Some("y=123456&m=3"));
        assert_eq!(request.year, None);
        assert_eq!(request.month, Some(3));
    }

    #[test]
    fn fallbacks_are_independent() {
        let today = ym(2025, 6);
        let request = CalendarRequest {
            year: Some(2020),
            ..CalendarRequest::default()
        };

        let params = resolve_params(&request, today, true);
        assert_eq!(params.year_month, ym(2020, 6));
        assert!(params.show_nav);
    }

    #[test]
    fn no_active_special_pins_the_current_month() {
        let today = ym(2025, 6);
        let request = CalendarRequest {
            year: Some(2020),
            month: Some(1),
            lang: Language::En,
            admin_preview: false,
        };

        let params = resolve_params(&request, today, false);
        assert_eq!(params.year_month, today);
        assert!(!params.show_nav);
        assert_eq!(params.lang, Language::En);
    }

    struct FixtureRepo {
        has_special: bool,
        defaults: Vec<PromotionRecord>,
        plan: Vec<PromotionRecord>,
        settings: Option<CalendarSettingsRecord>,
        requested: Mutex<Vec<(i32, i32)>>,
    }

    #[async_trait]
    impl CalendarRepo for FixtureRepo {
        async fn list_weekly_defaults(&self) -> Result<Vec<PromotionRecord>, RepoError> {
            Ok(self.defaults.clone())
        }

        async fn list_weekly_plan(
            &self,
            year: i32,
            month: i32,
        ) -> Result<Vec<PromotionRecord>, RepoError> {
            self.requested
                .lock()
                .expect("requested lock")
                .push((year, month));
            Ok(self.plan.clone())
        }

        async fn list_active_specials(
            &self,
            _year: i32,
            _month: i32,
        ) -> Result<Vec<PromotionRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn load_calendar_settings(
            &self,
        ) -> Result<Option<CalendarSettingsRecord>, RepoError> {
            Ok(self.settings.clone())
        }

        async fn has_any_active_special(&self) -> Result<bool, RepoError> {
            Ok(self.has_special)
        }
    }

    fn weekly_row(weekday: i16, lang: &str, title: &str) -> PromotionRecord {
        let mut translations = Translations::new();
        translations.insert(
            lang,
            PromotionTranslation {
                title: Some(title.to_string()),
                ..PromotionTranslation::default()
            },
        );
        PromotionRecord {
            weekday: Some(weekday),
            active: true,
            translations,
            ..PromotionRecord::default()
        }
    }

    fn service(repo: Arc<FixtureRepo>) -> CalendarService {
        let clock = Arc::new(ManualClock::new(datetime!(2025-07-04 12:00 UTC)));
        let cache = Arc::new(CalendarDataCache::new(
            repo.clone(),
            clock.clone(),
            &CacheConfig::default(),
        ));
        CalendarService::new(repo, cache, clock, Tz::UTC, DEFAULT_BACKGROUND)
    }

    async fn load(service: &CalendarService, request: &CalendarRequest) -> CalendarPage {
        let params = service.resolve(request).await.expect("params");
        service
            .load_resolved(params, request.admin_preview)
            .await
            .expect("page")
    }

    #[tokio::test]
    async fn requested_month_is_composed_from_plan_and_defaults() {
        let repo = Arc::new(FixtureRepo {
            has_special: true,
            defaults: vec![weekly_row(1, "en", "A"), weekly_row(2, "en", "B")],
            plan: vec![weekly_row(1, "en", "X")],
            settings: None,
            requested: Mutex::new(Vec::new()),
        });

        let request = CalendarRequest::from_query(Some("y=2024&m=0&lang=en"));
        let page = load(&service(repo.clone()), &request).await;

        assert_eq!(page.year_month, ym(2024, 0));
        assert!(page.show_nav);
        assert_eq!(page.month_label, "January");
        assert_eq!(page.previous, ym(2023, 11));
        assert_eq!(page.next, ym(2024, 1));

        let slots = page.weekly.slots();
        assert_eq!(slots[1].display.text.title, "X");
        assert_eq!(slots[2].display.text.title, "B");
        for index in [0, 3, 4, 5, 6] {
            assert!(slots[index].is_placeholder());
        }
        assert_eq!(page.bg_image_url, DEFAULT_BACKGROUND);
        assert_eq!(*repo.requested.lock().expect("requested lock"), vec![(2024, 0)]);
    }

    #[tokio::test]
    async fn gate_overrides_the_requested_month() {
        let repo = Arc::new(FixtureRepo {
            has_special: false,
            defaults: Vec::new(),
            plan: Vec::new(),
            settings: Some(CalendarSettingsRecord {
                bg_image_url: Some("/img/summer.png".to_string()),
            }),
            requested: Mutex::new(Vec::new()),
        });

        let request = CalendarRequest::from_query(Some("y=2024&m=0&lang=pt"));
        let page = load(&service(repo.clone()), &request).await;

        assert_eq!(page.year_month, ym(2025, 6));
        assert!(!page.show_nav);
        assert_eq!(page.month_label, "Julho");
        assert_eq!(page.bg_image_url, "/img/summer.png");
        assert_eq!(*repo.requested.lock().expect("requested lock"), vec![(2025, 6)]);
    }

    #[tokio::test]
    async fn empty_background_uses_the_default() {
        let repo = Arc::new(FixtureRepo {
            has_special: true,
            defaults: Vec::new(),
            plan: Vec::new(),
            settings: Some(CalendarSettingsRecord {
                bg_image_url: Some(String::new()),
            }),
            requested: Mutex::new(Vec::new()),
        });

        let page = load(&service(repo), &CalendarRequest::default()).await;
        assert_eq!(page.bg_image_url, DEFAULT_BACKGROUND);
    }
}
