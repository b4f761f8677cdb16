mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, ClearCacheBody, build_admin_router};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

/// Cookie whose presence marks an authenticated administrator.
pub const ADMIN_COOKIE: &str = "admin_auth";

/// A non-empty [`ADMIN_COOKIE`] turns on admin preview and unlocks admin routes.
fn has_admin_cookie(jar: &CookieJar) -> bool {
    jar.get(ADMIN_COOKIE)
        .is_some_and(|cookie| !cookie.value().is_empty())
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub admin: AdminState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for AdminState {
    fn from_ref(state: &RouterState) -> Self {
        state.admin.clone()
    }
}
