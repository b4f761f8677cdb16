use std::sync::Arc;

use axum::{
    Router,
    extract::{RawQuery, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::{
    application::{
        calendar::{CalendarRequest, CalendarService},
        error::HttpError,
        repos::HealthRepo,
    },
    cache::HOME_PATH,
    infra::cache::{ResponseCache, ResponseKey, should_store_response},
    presentation::views::{CalendarTemplate, CalendarView, render_template_response},
};

use super::{
    RouterState, build_admin_router, db_health_response, has_admin_cookie,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub calendar: Arc<CalendarService>,
    pub health: Arc<dyn HealthRepo>,
    pub response_cache: Option<ResponseCache>,
}

pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route(HOME_PATH, get(calendar_page))
        .route("/_health/db", get(public_health))
        .merge(build_admin_router())
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Render the calendar page.
///
/// The gate and parameter resolution run on every request. Rendered output
/// is then looked up by the resolved parameters, so a cached page never
/// outlives a change of the gate or of the current month. Admin previews
/// bypass the rendered-output cache entirely.
async fn calendar_page(
    State(state): State<HttpState>,
    jar: CookieJar,
    RawQuery(query): RawQuery,
) -> Response {
    let request =
        CalendarRequest::from_query(query.as_deref()).with_admin_preview(has_admin_cookie(&jar));

    let params = match state.calendar.resolve(&request).await {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };

    let cache = state
        .response_cache
        .as_ref()
        .filter(|_| !request.admin_preview);
    let key = ResponseKey::new(HOME_PATH, params);
    if let Some(cached) = cache.and_then(|cache| cache.get(&key)) {
        debug!(outcome = "hit", "Serving cached calendar page");
        return cached;
    }
    let epoch = cache.map(ResponseCache::epoch);

    let page = match state
        .calendar
        .load_resolved(params, request.admin_preview)
        .await
    {
        Ok(page) => page,
        Err(err) => return err.into_response(),
    };

    let response = match CalendarView::from_page(&page) {
        Ok(view) => render_template_response(CalendarTemplate { view }, StatusCode::OK),
        Err(err) => {
            return HttpError::from_error(
                "infra::http::public::calendar_page",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render calendar",
                &err,
            )
            .into_response();
        }
    };

    match (cache, epoch) {
        (Some(cache), Some(epoch)) if should_store_response(&response) => {
            match cache.store_response(key, response, epoch).await {
                Ok(response) => response,
                Err((response, err)) => {
                    warn!(error = %err, "Failed to cache calendar page");
                    response
                }
            }
        }
        _ => response,
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}
