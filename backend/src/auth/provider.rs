use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Session, SessionUser};

/// Result of a sign-up: a live session when the provider auto-confirms,
/// otherwise the user has to follow the confirmation email first.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationSent(SessionUser),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AppError>;
    /// Exchanges the token from a recovery email for a short-lived session.
    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AppError>;
    async fn update_password(&self, access_token: &str, password: &str) -> Result<SessionUser, AppError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError>;
    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AppError>;
}
