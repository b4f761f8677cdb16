//! Promotion records as stored, and translation resolution.

use serde::{Deserialize, Serialize};

use super::language::Language;

/// Link used when neither a translation nor the record provides one.
pub const DEFAULT_LINK: &str = "#";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionTranslation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub button: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "richHtml", alias = "rich_html")]
    pub rich_html: Option<String>,
}

/// One stored translation, tagged with its language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub lang: String,
    #[serde(flatten)]
    pub text: PromotionTranslation,
}

/// Translations of a promotion in storage order.
///
/// Language codes are unique. When the requested language is missing the
/// first entry is used; that order carries no business meaning beyond being
/// stable for a given record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TranslationEntry>", into = "Vec<TranslationEntry>")]
pub struct Translations {
    entries: Vec<TranslationEntry>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the translation for `lang`, keeping its original position.
    pub fn insert(&mut self, lang: impl Into<String>, text: PromotionTranslation) {
        let lang = lang.into();
        match self.entries.iter_mut().find(|entry| entry.lang == lang) {
            Some(entry) => entry.text = text,
            None => self.entries.push(TranslationEntry { lang, text }),
        }
    }

    pub fn get(&self, lang: &str) -> Option<&PromotionTranslation> {
        self.entries
            .iter()
            .find(|entry| entry.lang == lang)
            .map(|entry| &entry.text)
    }

    pub fn first(&self) -> Option<&PromotionTranslation> {
        self.entries.first().map(|entry| &entry.text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.entries.iter()
    }
}

impl From<Vec<TranslationEntry>> for Translations {
    fn from(entries: Vec<TranslationEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<Translations> for Vec<TranslationEntry> {
    fn from(translations: Translations) -> Self {
        translations.entries
    }
}

impl FromIterator<TranslationEntry> for Translations {
    fn from_iter<I: IntoIterator<Item = TranslationEntry>>(iter: I) -> Self {
        let mut translations = Self::new();
        for entry in iter {
            translations.insert(entry.lang, entry.text);
        }
        translations
    }
}

/// A weekly default, a weekly plan override, or a dated special promotion.
///
/// Weekly kinds carry `weekday` (0 = Sunday); plan rows also carry
/// `year`/`month`; specials carry `year`/`month`/`day`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromotionRecord {
    pub weekday: Option<i16>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub title: Option<String>,
    pub button: Option<String>,
    pub link: Option<String>,
    pub rich_html: Option<String>,
    pub icon: Option<String>,
    pub button_color: Option<String>,
    pub category: Option<String>,
    pub active: bool,
    pub translations: Translations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedText {
    pub title: String,
    pub button: String,
    pub link: String,
    pub rich_html: Option<String>,
}

impl Default for ResolvedText {
    fn default() -> Self {
        Self {
            title: String::new(),
            button: String::new(),
            link: DEFAULT_LINK.to_string(),
            rich_html: None,
        }
    }
}

/// Pick display text for `record` in `language`.
///
/// Every field falls back on its own: translation value, then the record's
/// flat field, then the field default. An empty string counts as a value.
pub fn resolve_text(record: &PromotionRecord, language: Language) -> ResolvedText {
    let translation = record
        .translations
        .get(language.as_str())
        .or_else(|| record.translations.first());

    let pick = |from_translation: Option<&Option<String>>, flat: &Option<String>| {
        from_translation
            .and_then(Option::as_ref)
            .or(flat.as_ref())
            .cloned()
    };

    ResolvedText {
        title: pick(translation.map(|t| &t.title), &record.title).unwrap_or_default(),
        button: pick(translation.map(|t| &t.button), &record.button).unwrap_or_default(),
        link: pick(translation.map(|t| &t.link), &record.link)
            .unwrap_or_else(|| DEFAULT_LINK.to_string()),
        rich_html: pick(translation.map(|t| &t.rich_html), &record.rich_html),
    }
}

/// Singleton calendar presentation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarSettingsRecord {
    pub bg_image_url: Option<String>,
}
