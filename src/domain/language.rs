//! Display languages accepted by the calendar.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

const PT_MONTHS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

const EN_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const PT_WEEKDAYS: [&str; 7] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];
const EN_WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    /// Allow-list in the order the language switcher presents it.
    pub const ALLOWED: [Language; 2] = [Language::Pt, Language::En];

    /// Used whenever a request names no language or one outside the allow-list.
    pub const PRIMARY: Language = Language::Pt;

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }

    /// Resolve a raw query value against the allow-list. Matching is exact.
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok())
            .unwrap_or(Self::PRIMARY)
    }

    /// Long, capitalized month name for a 0-based month index.
    pub fn month_name(self, month: u8) -> &'static str {
        let names = match self {
            Language::Pt => &PT_MONTHS,
            Language::En => &EN_MONTHS,
        };
        names[usize::from(month.min(11))]
    }

    /// Short weekday header, Sunday first.
    pub fn weekday_abbreviations(self) -> &'static [&'static str; 7] {
        match self {
            Language::Pt => &PT_WEEKDAYS,
            Language::En => &EN_WEEKDAYS,
        }
    }

    pub fn calendar_heading(self) -> &'static str {
        match self {
            Language::Pt => "Calendário de Promoções",
            Language::En => "Promotion Calendar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALLOWED
            .into_iter()
            .find(|language| language.as_str() == value)
            .ok_or_else(|| DomainError::validation(format!("unsupported language `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_missing_language_falls_back_to_primary() {
        assert_eq!(Language::from_query(None), Language::Pt);
        assert_eq!(Language::from_query(Some("de")), Language::Pt);
        assert_eq!(Language::from_query(Some("EN")), Language::Pt);
        assert_eq!(Language::from_query(Some("en")), Language::En);
    }

    #[test]
    fn month_names_are_capitalized_per_locale() {
        assert_eq!(Language::Pt.month_name(0), "Janeiro");
        assert_eq!(Language::Pt.month_name(2), "Março");
        assert_eq!(Language::En.month_name(11), "December");
    }

    #[test]
    fn round_trips_through_display() {
        for language in Language::ALLOWED {
            let parsed: Language = language.to_string().parse().expect("allowed language");
            assert_eq!(parsed, language);
        }
    }
}
