use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use super::SupabaseClient;
use super::dto::{
    PasswordGrant, RecoverRequest, RefreshGrant, SignUpRequest, SignUpResponse, TokenResponse,
    UpdateUserRequest, UserDto, UserMetadata, VerifyRequest,
};
use crate::auth::provider::{AuthProvider, SignUpOutcome};
use crate::error::AppError;
use crate::models::{Session, SessionUser};

/// GoTrue client.
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn token(&self, grant_type: &str, body: &(impl serde::Serialize + Sync)) -> Result<Session, AppError> {
        let mut url = self.client.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response: TokenResponse = self
            .client
            .send_json(self.client.request(Method::POST, url).json(body))
            .await?;
        Ok(response.into_session())
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.token("password", &PasswordGrant { email, password }).await
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<SignUpOutcome, AppError> {
        let url = self.client.endpoint("auth/v1/signup")?;
        let body = SignUpRequest {
            email,
            password,
            data: UserMetadata { full_name: Some(display_name.to_string()) },
        };
        let response: SignUpResponse = self
            .client
            .send_json(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(match response {
            SignUpResponse::Session(token) => SignUpOutcome::SignedIn(token.into_session()),
            SignUpResponse::User(user) => {
                debug!("confirmation email sent to {}", email);
                SignUpOutcome::ConfirmationSent(user.into())
            }
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = self.client.endpoint("auth/v1/logout")?;
        let client = self.client.with_token(Some(access_token));
        client.send_empty(client.request(Method::POST, url)).await
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AppError> {
        let mut url = self.client.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        self.client
            .send_empty(self.client.request(Method::POST, url).json(&RecoverRequest { email }))
            .await
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AppError> {
        let url = self.client.endpoint("auth/v1/verify")?;
        let body = VerifyRequest { kind: "recovery", token_hash };
        let response: TokenResponse = self
            .client
            .send_json(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(response.into_session())
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<SessionUser, AppError> {
        let url = self.client.endpoint("auth/v1/user")?;
        let client = self.client.with_token(Some(access_token));
        let user: UserDto = client
            .send_json(client.request(Method::PUT, url).json(&UpdateUserRequest { password }))
            .await?;
        Ok(user.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.token("refresh_token", &RefreshGrant { refresh_token }).await
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AppError> {
        let url = self.client.endpoint("auth/v1/user")?;
        let client = self.client.with_token(Some(access_token));
        let user: UserDto = client.send_json(client.request(Method::GET, url)).await?;
        Ok(user.into())
    }
}
