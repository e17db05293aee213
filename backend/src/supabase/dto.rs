use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Session, SessionUser};

/// Error body shapes used by PostgREST (`message`), GoTrue (`msg`,
/// `error_description`) and storage (`error`).
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub msg: Option<String>,
    pub error_description: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description).or(self.error)
    }
}

#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: UserMetadata,
}

#[derive(Debug, Serialize)]
pub struct RecoverRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub token_hash: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserRequest<'a> {
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

impl From<UserDto> for SessionUser {
    fn from(user: UserDto) -> Self {
        SessionUser {
            id: user.id,
            email: user.email,
            display_name: user.user_metadata.and_then(|m| m.full_name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub user: UserDto,
}

impl TokenResponse {
    pub fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// `/signup` answers with a session when the project auto-confirms, or with
/// the bare user when a confirmation email was sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(UserDto),
}

#[derive(Debug, Serialize)]
pub struct CourseVisibility {
    pub is_published: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LectureVisibility {
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_without_session_is_a_bare_user() {
        let body = r#"{"id":"u1","email":"a@example.com","user_metadata":{"full_name":"আবদুল্লাহ"},"confirmation_sent_at":"2024-01-01T00:00:00Z"}"#;
        match serde_json::from_str::<SignUpResponse>(body).unwrap() {
            SignUpResponse::User(user) => {
                let user = SessionUser::from(user);
                assert_eq!(user.display_name.as_deref(), Some("আবদুল্লাহ"));
            }
            SignUpResponse::Session(_) => panic!("no access token in body"),
        }
    }

    #[test]
    fn token_expiry_prefers_absolute_timestamp() {
        let body = r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"expires_at":1700000000,"user":{"id":"u1"}}"#;
        let session = serde_json::from_str::<TokenResponse>(body).unwrap().into_session();
        assert_eq!(session.expires_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(session.user.email, None);
    }
}
