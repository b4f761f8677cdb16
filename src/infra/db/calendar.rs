use async_trait::async_trait;
use sqlx::types::Json;

use crate::{
    application::repos::{CalendarRepo, RepoError},
    domain::promotions::{CalendarSettingsRecord, PromotionRecord, TranslationEntry},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PromotionRow {
    weekday: Option<i16>,
    year: Option<i32>,
    month: Option<i32>,
    day: Option<i32>,
    title: Option<String>,
    button: Option<String>,
    link: Option<String>,
    rich_html: Option<String>,
    icon: Option<String>,
    button_color: Option<String>,
    category: Option<String>,
    active: bool,
    translations: Json<Vec<TranslationEntry>>,
}

impl From<PromotionRow> for PromotionRecord {
    fn from(row: PromotionRow) -> Self {
        Self {
            weekday: row.weekday,
            year: row.year,
            month: row.month,
            day: row.day,
            title: row.title,
            button: row.button,
            link: row.link,
            rich_html: row.rich_html,
            icon: row.icon,
            button_color: row.button_color,
            category: row.category,
            active: row.active,
            translations: row.translations.0.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CalendarSettingsRow {
    bg_image_url: Option<String>,
}

const WEEKLY_DEFAULTS_SQL: &str = r#"
    SELECT weekday,
           NULL::int4 AS year,
           NULL::int4 AS month,
           NULL::int4 AS day,
           title, button, link, rich_html, icon, button_color, category,
           active, translations
    FROM weekly_promotions
    ORDER BY weekday ASC, id ASC
"#;

const WEEKLY_PLAN_SQL: &str = r#"
    SELECT weekday,
           year,
           month,
           NULL::int4 AS day,
           title, button, link, rich_html, icon, button_color, category,
           active, translations
    FROM weekly_plans
    WHERE year = $1 AND month = $2
    ORDER BY weekday ASC, id ASC
"#;

const ACTIVE_SPECIALS_SQL: &str = r#"
    SELECT NULL::int2 AS weekday,
           year,
           month,
           day,
           title, button, link, rich_html, icon, button_color, category,
           active, translations
    FROM special_promotions
    WHERE year = $1 AND month = $2 AND active = TRUE
    ORDER BY day ASC, id ASC
"#;

#[async_trait]
impl CalendarRepo for PostgresRepositories {
    async fn list_weekly_defaults(&self) -> Result<Vec<PromotionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PromotionRow>(WEEKLY_DEFAULTS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PromotionRecord::from).collect())
    }

    async fn list_weekly_plan(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PromotionRow>(WEEKLY_PLAN_SQL)
            .bind(year)
            .bind(month)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PromotionRecord::from).collect())
    }

    async fn list_active_specials(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PromotionRow>(ACTIVE_SPECIALS_SQL)
            .bind(year)
            .bind(month)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PromotionRecord::from).collect())
    }

    async fn load_calendar_settings(&self) -> Result<Option<CalendarSettingsRecord>, RepoError> {
        let row = sqlx::query_as::<_, CalendarSettingsRow>(
            "SELECT bg_image_url FROM calendar_settings ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| CalendarSettingsRecord {
            bg_image_url: row.bg_image_url,
        }))
    }

    async fn has_any_active_special(&self) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM special_promotions WHERE active = TRUE)",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
