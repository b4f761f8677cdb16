//! HTTP transport for the admin console.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url, header::COOKIE};

use crate::application::admin_console::{AdminApi, AdminApiError, AdminIdentity, ClearOutcome};

const ME_PATH: &str = "/api/admin/me";
const CLEAR_CACHE_PATH: &str = "/api/admin/clear-calendar-cache";
const AUTH_PATH: &str = "/api/auth";
const AUTH_COOKIE: &str = "admin_auth";

#[derive(Clone, Debug)]
pub struct HttpAdminApi {
    client: Client,
    base: Url,
    auth_cookie: Option<String>,
}

impl HttpAdminApi {
    pub fn new(base_url: &str, auth_cookie: Option<String>) -> Result<Self, AdminApiError> {
        let base = Url::parse(base_url)
            .and_then(|url| url.join("/"))
            .map_err(|err| AdminApiError::Transport(format!("invalid base URL: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base,
            auth_cookie: auth_cookie.filter(|value| !value.is_empty()),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("promocal-admin/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AdminApiError> {
        let url = self
            .base
            .join(path)
            .map_err(|err| AdminApiError::Transport(err.to_string()))?;
        let builder = self.client.request(method, url);
        Ok(match &self.auth_cookie {
            Some(value) => builder.header(COOKIE, format!("{AUTH_COOKIE}={value}")),
            None => builder,
        })
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, AdminApiError> {
        self.request(method, path)?
            .send()
            .await
            .map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> AdminApiError {
    AdminApiError::Transport(err.to_string())
}

#[async_trait]
impl AdminApi for HttpAdminApi {
    async fn me(&self) -> Result<Option<AdminIdentity>, AdminApiError> {
        let response = self.send(Method::GET, ME_PATH).await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice::<AdminIdentity>(&bytes)
            .map(Some)
            .map_err(|err| AdminApiError::Decode(err.to_string()))
    }

    async fn clear_calendar_cache(&self) -> Result<ClearOutcome, AdminApiError> {
        let response = self.send(Method::POST, CLEAR_CACHE_PATH).await?;
        let status = response.status();
        if status.is_success() {
            Ok(ClearOutcome::Cleared)
        } else {
            Ok(ClearOutcome::Rejected {
                status: status.as_u16(),
            })
        }
    }

    async fn logout(&self) -> Result<(), AdminApiError> {
        let response = self.send(Method::DELETE, AUTH_PATH).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AdminApiError::Status(status.as_u16()))
        }
    }
}
