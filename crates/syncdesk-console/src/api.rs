use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use syncdesk_core::config::ApiConfig;
use syncdesk_notify::{JobLogNotification, NotificationFeed, NotifyError};
use syncdesk_schedule::JobSchedule;
use syncdesk_session::{
    ActivityHub, ActivityKind, ActivityPersistence, LogoutTransport, SessionError,
};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server no longer accepts the stored session.
    #[error("session rejected by server")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Who a request is made for. Only user-initiated requests count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Background,
    /// The sign-in call itself: a 401 here means bad credentials.
    SignIn,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub must_change_password: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobPage {
    #[serde(default)]
    pub data: Vec<JobSchedule>,
    #[serde(default)]
    pub meta: PageMeta,
}

/// HTTP client for the master's `/api` surface.
///
/// Sends the stored bearer token, reports user-initiated requests to the
/// activity hub, and flags a 401 on [`unauthorized`](Self::unauthorized).
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    persistence: ActivityPersistence,
    activity: Arc<ActivityHub>,
    unauthorized_tx: watch::Sender<bool>,
}

impl ApiClient {
    pub fn new(
        config: &ApiConfig,
        persistence: ActivityPersistence,
        activity: Arc<ActivityHub>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let (unauthorized_tx, _) = watch::channel(false);
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            persistence,
            activity,
            unauthorized_tx,
        })
    }

    /// Flips to `true` the first time the server answers 401.
    pub fn unauthorized(&self) -> watch::Receiver<bool> {
        self.unauthorized_tx.subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let req = self
            .client
            .post(self.url("login"))
            .json(&LoginRequest { username, password });
        self.send(req, Origin::SignIn).await
    }

    pub async fn jobs(&self, page: u32, page_size: u32) -> Result<JobPage, ApiError> {
        let req = self
            .client
            .get(self.url("jobs"))
            .query(&[("page", page), ("page_size", page_size)]);
        self.send(req, Origin::User).await
    }

    /// The ten most recent job logs, newest first.
    pub async fn notifications(&self, origin: Origin) -> Result<Vec<JobLogNotification>, ApiError> {
        self.send(self.client.get(self.url("notifications")), origin)
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        origin: Origin,
    ) -> Result<T, ApiError> {
        if origin == Origin::User {
            self.activity.emit(ActivityKind::Request);
        }
        let req = match self.persistence.token() {
            Some(token) if origin != Origin::SignIn => req.bearer_auth(token),
            _ => req,
        };

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = status_error(status, &text, origin);
            if matches!(err, ApiError::Unauthorized) {
                self.unauthorized_tx.send_replace(true);
            }
            warn!(status = status.as_u16(), ?origin, "API error");
            return Err(err);
        }
        debug!(status = status.as_u16(), ?origin, "API request ok");

        resp.json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Map a non-success response. The server reports failures as `{"error": "..."}`.
fn status_error(status: StatusCode, body: &str, origin: Origin) -> ApiError {
    if status == StatusCode::UNAUTHORIZED && origin != Origin::SignIn {
        return ApiError::Unauthorized;
    }
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string());
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl LogoutTransport for ApiClient {
    async fn logout(&self) -> syncdesk_session::Result<()> {
        self.send::<serde_json::Value>(self.client.post(self.url("logout")), Origin::Background)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::LogoutTransportFailure(e.to_string()))
    }
}

/// Background polling; does not count as user activity.
#[async_trait]
impl NotificationFeed for ApiClient {
    type Item = JobLogNotification;

    async fn fetch(&self) -> syncdesk_notify::Result<Vec<JobLogNotification>> {
        self.notifications(Origin::Background)
            .await
            .map_err(|e| NotifyError::PollFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdesk_session::MemoryStore;

    #[test]
    fn unauthorized_outside_sign_in() {
        let err = status_error(StatusCode::UNAUTHORIZED, "", Origin::Background);
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn bad_credentials_keep_server_message() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"Invalid username or password"}"#,
            Origin::SignIn,
        );
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid username or password");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down", Origin::User);
        assert!(matches!(err, ApiError::Api { status: 502, ref message } if message == "upstream down"));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let config = ApiConfig {
            base_url: "http://master:8080/api/".into(),
            request_timeout_secs: 5,
        };
        let persistence = ActivityPersistence::new(Arc::new(MemoryStore::new()));
        let client = ApiClient::new(&config, persistence, Arc::new(ActivityHub::new())).unwrap();
        assert_eq!(client.url("notifications"), "http://master:8080/api/notifications");
    }

    #[test]
    fn job_page_decodes() {
        let page: JobPage = serde_json::from_str(
            r#"{"data":[{"id":4,"name":"orders","schedule":"0 */6 * * *","last_run":"2024-01-01T00:00:00Z","status":"completed"}],
                "meta":{"total":1,"page":1,"page_size":10}}"#,
        )
        .unwrap();
        assert_eq!(page.data[0].schedule, "0 */6 * * *");
        assert_eq!(page.meta.total, 1);
    }
}
