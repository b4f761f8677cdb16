use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::calendar::{CalendarPage, LANG_PARAM, MONTH_PARAM, YEAR_PARAM};
use crate::application::error::HttpError;
use crate::domain::calendar::YearMonth;
use crate::domain::error::DomainError;
use crate::domain::language::Language;
use crate::domain::schedule::PromotionDisplay;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Link to the calendar page for a month in a language.
pub fn calendar_href(year_month: YearMonth, lang: Language) -> String {
    format!(
        "/?{YEAR_PARAM}={}&{MONTH_PARAM}={}&{LANG_PARAM}={}",
        year_month.year,
        year_month.month,
        lang.as_str()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionView {
    pub title: String,
    pub button: String,
    pub link: String,
    pub rich_html: Option<String>,
    pub icon: String,
    pub button_color: String,
    pub category: String,
    pub active: bool,
    pub special: bool,
}

impl PromotionView {
    fn from_display(display: &PromotionDisplay, special: bool) -> Self {
        Self {
            title: display.text.title.clone(),
            button: display.text.button.clone(),
            link: display.text.link.clone(),
            rich_html: display.text.rich_html.clone(),
            icon: display.icon.clone(),
            button_color: display.button_color.clone(),
            category: display.category.clone(),
            active: display.active,
            special,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCellView {
    /// Empty for padding cells outside the month.
    pub day_label: String,
    pub in_month: bool,
    pub entries: Vec<PromotionView>,
}

impl DayCellView {
    fn padding() -> Self {
        Self {
            day_label: String::new(),
            in_month: false,
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthNavView {
    pub previous_href: String,
    pub next_href: String,
    pub month_label: &'static str,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLinkView {
    pub code: &'static str,
    pub href: String,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    pub lang: &'static str,
    pub heading: &'static str,
    pub bg_image_url: String,
    pub admin_preview: bool,
    pub nav: Option<MonthNavView>,
    pub month_label: &'static str,
    pub year: i32,
    pub weekday_labels: Vec<&'static str>,
    pub weeks: Vec<Vec<DayCellView>>,
    pub languages: Vec<LanguageLinkView>,
}

impl CalendarView {
    pub fn from_page(page: &CalendarPage) -> Result<Self, DomainError> {
        let lang = page.lang;
        let nav = page.show_nav.then(|| MonthNavView {
            previous_href: calendar_href(page.previous, lang),
            next_href: calendar_href(page.next, lang),
            month_label: page.month_label,
            year: page.year_month.year,
        });

        let languages = Language::ALLOWED
            .iter()
            .map(|candidate| LanguageLinkView {
                code: candidate.as_str(),
                href: calendar_href(page.year_month, *candidate),
                current: *candidate == lang,
            })
            .collect();

        Ok(Self {
            lang: lang.as_str(),
            heading: lang.calendar_heading(),
            bg_image_url: page.bg_image_url.clone(),
            admin_preview: page.admin_preview,
            nav,
            month_label: page.month_label,
            year: page.year_month.year,
            weekday_labels: lang.weekday_abbreviations().to_vec(),
            weeks: build_weeks(page)?,
            languages,
        })
    }
}

fn build_weeks(page: &CalendarPage) -> Result<Vec<Vec<DayCellView>>, DomainError> {
    let weeks = page.year_month.weeks()?;
    Ok(weeks
        .iter()
        .map(|week| {
            week.iter()
                .enumerate()
                .map(|(weekday, day)| match day {
                    Some(day) => day_cell(page, weekday, *day),
                    None => DayCellView::padding(),
                })
                .collect()
        })
        .collect())
}

/// Specials for the day replace the weekly slot. Inactive entries only show
/// in admin preview.
fn day_cell(page: &CalendarPage, weekday: usize, day: u8) -> DayCellView {
    let visible = |display: &PromotionDisplay| display.active || page.admin_preview;

    let specials: Vec<PromotionView> = page
        .specials
        .iter()
        .filter(|entry| entry.day == i32::from(day))
        .filter(|entry| visible(&entry.display))
        .map(|entry| PromotionView::from_display(&entry.display, true))
        .collect();

    let entries = if specials.is_empty() {
        page.weekly
            .slot(weekday)
            .filter(|slot| !slot.is_placeholder())
            .filter(|slot| visible(&slot.display))
            .map(|slot| vec![PromotionView::from_display(&slot.display, false)])
            .unwrap_or_default()
    } else {
        specials
    };

    DayCellView {
        day_label: day.to_string(),
        in_month: true,
        entries,
    }
}

#[derive(Template)]
#[template(path = "calendar.html")]
pub struct CalendarTemplate {
    pub view: CalendarView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promotions::{PromotionRecord, PromotionTranslation, Translations};
    use crate::domain::schedule::{normalize_specials, normalize_weekly};

    fn record(title: &str, active: bool) -> PromotionRecord {
        let mut translations = Translations::new();
        translations.insert(
            "en",
            PromotionTranslation {
                title: Some(title.to_string()),
                ..PromotionTranslation::default()
            },
        );
        PromotionRecord {
            active,
            translations,
            ..PromotionRecord::default()
        }
    }

    fn page(admin_preview: bool) -> CalendarPage {
        let year_month = YearMonth::new(2024, 0).expect("valid month");
        let monday = PromotionRecord {
            weekday: Some(1),
            ..record("Monday deal", true)
        };
        let tuesday = PromotionRecord {
            weekday: Some(2),
            ..record("Hidden Tuesday", false)
        };
        let special = PromotionRecord {
            year: Some(2024),
            month: Some(0),
            day: Some(15),
            ..record("New promo", true)
        };

        CalendarPage {
            year_month,
            lang: Language::En,
            show_nav: true,
            previous: year_month.previous(),
            next: year_month.next(),
            month_label: year_month.month_label(Language::En),
            weekly: normalize_weekly(&[monday, tuesday], &[], Language::En),
            specials: normalize_specials(&[special], Language::En),
            bg_image_url: "/img/bg-calendar.png".to_string(),
            admin_preview,
        }
    }

    fn cell<'a>(view: &'a CalendarView, day: &str) -> &'a DayCellView {
        view.weeks
            .iter()
            .flatten()
            .find(|cell| cell.day_label == day)
            .expect("day present")
    }

    #[test]
    fn navigation_links_keep_language() {
        let view = CalendarView::from_page(&page(false)).expect("view");
        let nav = view.nav.expect("nav shown");
        assert_eq!(nav.previous_href, "/?y=2023&m=11&lang=en");
        assert_eq!(nav.next_href, "/?y=2024&m=1&lang=en");
        assert_eq!(view.languages[0].href, "/?y=2024&m=0&lang=pt");
        assert!(view.languages[1].current);
    }

    #[test]
    fn special_replaces_the_weekly_slot() {
        let view = CalendarView::from_page(&page(false)).expect("view");

        // 2024-01-15 is a Monday.
        let special_day = cell(&view, "15");
        assert_eq!(special_day.entries.len(), 1);
        assert_eq!(special_day.entries[0].title, "New promo");
        assert!(special_day.entries[0].special);

        let plain_monday = cell(&view, "8");
        assert_eq!(plain_monday.entries[0].title, "Monday deal");
    }

    #[test]
    fn inactive_entries_show_only_in_admin_preview() {
        let view = CalendarView::from_page(&page(false)).expect("view");
        assert!(cell(&view, "9").entries.is_empty());

        let view = CalendarView::from_page(&page(true)).expect("view");
        assert_eq!(cell(&view, "9").entries[0].title, "Hidden Tuesday");
        assert!(cell(&view, "10").entries.is_empty());
    }

    #[test]
    fn padding_cells_fill_the_first_week() {
        let view = CalendarView::from_page(&page(false)).expect("view");
        // January 2024 starts on a Monday.
        assert!(!view.weeks[0][0].in_month);
        assert_eq!(view.weeks[0][1].day_label, "1");
    }

    #[test]
    fn template_renders_heading_and_rich_html() {
        let mut page = page(true);
        page.specials[0].display.text.rich_html = Some("<b>Bold</b>".to_string());
        let view = CalendarView::from_page(&page).expect("view");
        let html = CalendarTemplate { view }.render().expect("render");

        assert!(html.contains("Promotion Calendar"));
        assert!(html.contains("Admin preview"));
        assert!(html.contains("<b>Bold</b>"));
        assert!(html.contains("/?y=2023&m=11&lang=en"));
    }
}
