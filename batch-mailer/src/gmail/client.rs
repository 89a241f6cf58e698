//! Gmail REST client.
//!
//! Wraps the three API calls a run needs: reading the authenticated profile,
//! listing send-as aliases, and sending a raw message.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{error, info, warn};
use url::Url;

use super::auth::AccessToken;
use super::message::OutgoingMessage;
use super::types::{ApiErrorBody, Profile, SendAs, SendAsList, SendRequest, SentMessage};
use crate::error::{ConfigError, RemoteError};

/// Default public endpoint of the Gmail API.
pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com";

/// Parse a base URL, making sure relative API paths join under it.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// HTTP client bound to one access token.
///
/// Each client owns its own connection pool, so workers that each hold a
/// client never share connections.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: Url,
    token: AccessToken,
}

impl GmailClient {
    pub fn new(base_url: Url, token: AccessToken, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::Other(format!("Invalid endpoint {path}: {e}")))
    }

    /// Address of the authenticated account.
    pub async fn profile(&self) -> Result<Profile, RemoteError> {
        let url = self.endpoint("gmail/v1/users/me/profile")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token.secret())
            .send()
            .await?;

        let profile: Profile = check_status(resp).await?.json().await?;
        info!(email = %profile.email_address, "gmail_profile_loaded");
        Ok(profile)
    }

    /// Send-as identities configured on the account.
    pub async fn send_as_aliases(&self) -> Result<Vec<SendAs>, RemoteError> {
        let url = self.endpoint("gmail/v1/users/me/settings/sendAs")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token.secret())
            .send()
            .await?;

        let list: SendAsList = check_status(resp).await?.json().await?;
        info!(count = list.send_as.len(), "gmail_send_as_loaded");
        Ok(list.send_as)
    }

    /// Submit a message. Returns the message id the API assigned, if any.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, RemoteError> {
        let url = self.endpoint("gmail/v1/users/me/messages/send")?;
        let raw = message.to_raw().inspect_err(|e| {
            warn!(to = %message.to, error = %e, "gmail_send_invalid_message");
        })?;

        let result = self
            .http
            .post(url)
            .bearer_auth(self.token.secret())
            .json(&SendRequest { raw: &raw })
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(to = %message.to, error = %e, "gmail_send_timeout");
                } else {
                    error!(to = %message.to, error = %e, "gmail_send_request_error");
                }
                return Err(e.into());
            }
        };

        let sent: SentMessage = check_status(resp).await?.json().await?;

        info!(
            to = %message.to,
            message_id = ?sent.id,
            thread_id = ?sent.thread_id,
            raw_length = raw.len(),
            "gmail_send_complete"
        );

        Ok(sent.id.filter(|id| !id.is_empty()))
    }
}

/// Turn a non-success response into a classified `RemoteError`.
async fn check_status(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(api) if api.error.is_rate_limit() => RemoteError::RateLimited(api.error.message),
        Ok(api) => RemoteError::from_status(status.as_u16(), api.error.message),
        Err(_) => {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.chars().take(200).collect()
            };
            RemoteError::from_status(status.as_u16(), message)
        }
    };

    warn!(status = status.as_u16(), error = %err, "gmail_api_error");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::message::Sender;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GmailClient {
        GmailClient::new(
            parse_base_url(&server.uri()).unwrap(),
            AccessToken::new("test-token"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: Sender::new(None, "me@example.com"),
            to: "ana@example.com".into(),
            subject: "Hello".into(),
            html_body: "<p>Hi</p>".into(),
            reply_to: None,
            attachments: Vec::new().into(),
        }
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("https://gmail.googleapis.com").unwrap().as_str(),
            "https://gmail.googleapis.com/"
        );
        assert_eq!(
            parse_base_url("http://localhost:8080/proxy").unwrap().as_str(),
            "http://localhost:8080/proxy/"
        );
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/profile"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"emailAddress": "me@gmail.com"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server).profile().await.unwrap();
        assert_eq!(profile.email_address, "me@gmail.com");
    }

    #[tokio::test]
    async fn test_send_as_aliases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/settings/sendAs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sendAs": [
                    {"sendAsEmail": "me@gmail.com", "isPrimary": true},
                    {"sendAsEmail": "team@example.org", "verificationStatus": "accepted"}
                ]
            })))
            .mount(&server)
            .await;

        let aliases = client(&server).send_as_aliases().await.unwrap();
        let emails: Vec<_> = aliases.iter().map(|a| a.send_as_email.as_str()).collect();
        assert_eq!(emails, vec!["me@gmail.com", "team@example.org"]);
    }

    #[tokio::test]
    async fn test_send_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(body_string_contains("\"raw\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "18c1f", "threadId": "18c1f"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).send(&message()).await.unwrap();
        assert_eq!(id.as_deref(), Some("18c1f"));
    }

    #[tokio::test]
    async fn test_send_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": ""})))
            .mount(&server)
            .await;

        let id = client(&server).send(&message()).await.unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_send_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Too many requests", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).send(&message()).await.unwrap_err();
        assert_eq!(err, RemoteError::RateLimited("Too many requests".into()));
    }

    #[tokio::test]
    async fn test_send_forbidden_rate_limit_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "User-rate limit exceeded",
                          "errors": [{"reason": "userRateLimitExceeded"}]}
            })))
            .mount(&server)
            .await;

        let err = client(&server).send(&message()).await.unwrap_err();
        assert!(matches!(err, RemoteError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_send_error_classification() {
        let cases = [
            (400, RemoteError::InvalidRequest("Invalid To header".into())),
            (403, RemoteError::PermissionDenied("Invalid To header".into())),
            (404, RemoteError::NotFound("Invalid To header".into())),
            (500, RemoteError::Other("HTTP 500: Invalid To header".into())),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                    "error": {"code": status, "message": "Invalid To header"}
                })))
                .mount(&server)
                .await;

            let err = client(&server).send(&message()).await.unwrap_err();
            assert_eq!(err, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_unbuildable_message_is_not_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m1"})))
            .expect(0)
            .mount(&server)
            .await;

        let mut bad = message();
        bad.to = "ana@example.com, eve@example.com>".into();

        let err = client(&server).send(&bad).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRequest(_)));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).profile().await.unwrap_err();
        assert_eq!(err, RemoteError::Other("HTTP 502: bad gateway".into()));
    }

    #[tokio::test]
    async fn test_send_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = GmailClient::new(
            parse_base_url(&server.uri()).unwrap(),
            AccessToken::new("t"),
            Duration::from_millis(50),
        )
        .unwrap();

        let err = client.send(&message()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Other(ref m) if m.starts_with("Request timed out")));
    }
}
