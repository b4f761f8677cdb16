use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::{
    error::ErrorReport,
    revalidate::{CacheInvalidator, clear_calendar_cache},
};

use super::{RouterState, has_admin_cookie};

const METRIC_CLEAR_FAILED: &str = "promocal_cache_clear_failed_total";

#[derive(Clone)]
pub struct AdminState {
    pub invalidator: Arc<dyn CacheInvalidator>,
}

/// JSON body of the clear-cache endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCacheBody {
    pub ok: bool,
}

pub fn build_admin_router() -> Router<RouterState> {
    Router::new().route(
        "/api/admin/clear-calendar-cache",
        post(clear_calendar_cache_handler),
    )
}

async fn clear_calendar_cache_handler(
    State(state): State<AdminState>,
    jar: CookieJar,
) -> Response {
    if !has_admin_cookie(&jar) {
        let status = StatusCode::UNAUTHORIZED;
        let mut response = (status, Json(ClearCacheBody { ok: false })).into_response();
        ErrorReport::from_message(
            "infra::http::admin::clear_calendar_cache",
            status,
            "missing admin session cookie",
        )
        .attach(&mut response);
        return response;
    }

    match clear_calendar_cache(state.invalidator.as_ref()).await {
        Ok(()) => (StatusCode::OK, Json(ClearCacheBody { ok: true })).into_response(),
        Err(err) => {
            counter!(METRIC_CLEAR_FAILED).increment(1);
            error!(error = %err, "Failed to clear calendar cache");

            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let mut response = (status, Json(ClearCacheBody { ok: false })).into_response();
            ErrorReport::from_error("infra::http::admin::clear_calendar_cache", status, &err)
                .attach(&mut response);
            response
        }
    }
}
