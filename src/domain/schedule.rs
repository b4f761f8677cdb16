//! Normalization of raw promotion rows into what the calendar displays.

use serde::Serialize;

use super::{
    language::Language,
    promotions::{PromotionRecord, ResolvedText, resolve_text},
};

pub const DEFAULT_BUTTON_COLOR: &str = "green";
pub const DEFAULT_CATEGORY: &str = "ALL";
pub const DAYS_PER_WEEK: usize = 7;

/// Display attributes shared by weekly slots and special entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionDisplay {
    pub text: ResolvedText,
    pub icon: String,
    pub active: bool,
    pub button_color: String,
    pub category: String,
}

impl PromotionDisplay {
    fn from_record(record: &PromotionRecord, language: Language) -> Self {
        Self {
            text: resolve_text(record, language),
            icon: non_empty_or(record.icon.as_deref(), ""),
            active: record.active,
            button_color: non_empty_or(record.button_color.as_deref(), DEFAULT_BUTTON_COLOR),
            category: non_empty_or(record.category.as_deref(), DEFAULT_CATEGORY),
        }
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// One weekday position of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySlot {
    #[serde(flatten)]
    pub display: PromotionDisplay,
}

impl WeeklySlot {
    /// Inert slot used when neither an override nor a default exists.
    pub fn placeholder() -> Self {
        Self {
            display: PromotionDisplay {
                text: ResolvedText::default(),
                icon: String::new(),
                active: false,
                button_color: DEFAULT_BUTTON_COLOR.to_string(),
                category: DEFAULT_CATEGORY.to_string(),
            },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

/// Exactly seven slots, Sunday = 0 through Saturday = 6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySchedule {
    slots: [WeeklySlot; DAYS_PER_WEEK],
}

impl WeeklySchedule {
    pub fn slot(&self, weekday: usize) -> Option<&WeeklySlot> {
        self.slots.get(weekday)
    }

    pub fn slots(&self) -> &[WeeklySlot; DAYS_PER_WEEK] {
        &self.slots
    }
}

fn weekday_index(record: &PromotionRecord) -> Option<usize> {
    record
        .weekday
        .and_then(|weekday| usize::try_from(weekday).ok())
        .filter(|weekday| *weekday < DAYS_PER_WEEK)
}

fn place_by_weekday(
    rows: &[PromotionRecord],
    language: Language,
) -> [Option<WeeklySlot>; DAYS_PER_WEEK] {
    let mut placed: [Option<WeeklySlot>; DAYS_PER_WEEK] = Default::default();
    for row in rows {
        if let Some(index) = weekday_index(row) {
            placed[index] = Some(WeeklySlot {
                display: PromotionDisplay::from_record(row, language),
            });
        }
    }
    placed
}

/// Merge the recurring defaults with this month's plan.
///
/// Per weekday: the plan row if present, else the default row, else the
/// placeholder. Rows with a missing or out-of-range weekday are dropped; when
/// a set repeats a weekday the later row wins.
pub fn normalize_weekly(
    defaults: &[PromotionRecord],
    overrides: &[PromotionRecord],
    language: Language,
) -> WeeklySchedule {
    let defaults = place_by_weekday(defaults, language);
    let overrides = place_by_weekday(overrides, language);

    let slots = std::array::from_fn(|index| {
        overrides[index]
            .clone()
            .or_else(|| defaults[index].clone())
            .unwrap_or_else(WeeklySlot::placeholder)
    });

    WeeklySchedule { slots }
}

/// A promotion pinned to one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialEntry {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    #[serde(flatten)]
    pub display: PromotionDisplay,
}

/// Map special rows to entries, preserving input order.
///
/// The caller has already filtered to the target month and active rows.
/// Rows without a full date cannot be placed and are skipped.
pub fn normalize_specials(rows: &[PromotionRecord], language: Language) -> Vec<SpecialEntry> {
    rows.iter()
        .filter_map(|row| {
            Some(SpecialEntry {
                year: row.year?,
                month: row.month?,
                day: row.day?,
                display: PromotionDisplay::from_record(row, language),
            })
        })
        .collect()
}
