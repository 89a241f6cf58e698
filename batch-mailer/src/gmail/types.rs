//! Gmail REST API payloads.

use serde::{Deserialize, Serialize};

/// `users.getProfile` response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
}

/// `users.settings.sendAs.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAsList {
    #[serde(default)]
    pub send_as: Vec<SendAs>,
}

/// A configured send-as identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAs {
    pub send_as_email: String,
    #[serde(default)]
    pub is_primary: bool,
    /// Absent for the primary address, `"accepted"` once an alias is verified.
    #[serde(default)]
    pub verification_status: Option<String>,
}

impl SendAs {
    /// Whether the identity may be used as a sender.
    pub fn is_usable(&self) -> bool {
        self.is_primary
            || self
                .verification_status
                .as_deref()
                .map_or(true, |s| s.eq_ignore_ascii_case("accepted"))
    }
}

/// `users.messages.send` request body.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    /// Base64url encoded RFC 2822 message.
    pub raw: &'a str,
}

/// `users.messages.send` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorDetail {
    /// Gmail reports some quota errors as 403 with a rate limit reason.
    pub fn is_rate_limit(&self) -> bool {
        self.status.as_deref() == Some("RESOURCE_EXHAUSTED")
            || self.errors.iter().any(|e| {
                e.reason
                    .as_deref()
                    .is_some_and(|r| r.to_ascii_lowercase().contains("ratelimitexceeded"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_as_list_deserialization() {
        let json = r#"{
            "sendAs": [
                {"sendAsEmail": "me@gmail.com", "isPrimary": true},
                {"sendAsEmail": "team@example.org", "displayName": "Team", "verificationStatus": "accepted"},
                {"sendAsEmail": "new@example.org", "verificationStatus": "pending"}
            ]
        }"#;

        let list: SendAsList = serde_json::from_str(json).unwrap();
        assert_eq!(list.send_as.len(), 3);
        assert!(list.send_as[0].is_usable());
        assert!(list.send_as[1].is_usable());
        assert!(!list.send_as[2].is_usable());
    }

    #[test]
    fn test_sent_message_deserialization() {
        let sent: SentMessage =
            serde_json::from_str(r#"{"id": "18c1", "threadId": "18c1", "labelIds": ["SENT"]}"#)
                .unwrap();
        assert_eq!(sent.id.as_deref(), Some("18c1"));

        let empty: SentMessage = serde_json::from_str("{}").unwrap();
        assert!(empty.id.is_none());
    }

    #[test]
    fn test_api_error_rate_limit_detection() {
        let json = r#"{"error": {"code": 403, "message": "User-rate limit exceeded",
            "errors": [{"reason": "userRateLimitExceeded", "message": "slow down"}]}}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert!(body.error.is_rate_limit());

        let json = r#"{"error": {"code": 403, "message": "Insufficient Permission",
            "status": "PERMISSION_DENIED"}}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert!(!body.error.is_rate_limit());
    }
}
