//! Agent authentication endpoints.

use sb_core::error::{SbError, SbResult};
use tracing::info;

use crate::client::ApiClient;
use crate::response::{LoginResponse, VerifyResponse};

impl ApiClient {
    /// Log in with agent credentials.
    ///
    /// The backend takes an OAuth2 password form where `username` carries
    /// the email. On success the returned token is also attached to this
    /// client for subsequent calls.
    pub async fn login(&mut self, email: &str, password: &str) -> SbResult<LoginResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SbError::InvalidInput("email and password are required".into()));
        }

        let form = [("username", email.trim()), ("password", password)];
        let resp = self.post_form("/auth/login", &form).await?;
        let login: LoginResponse = Self::read_json(resp).await?;

        info!("logged in as {} ({})", login.user.email, login.user.role);
        self.set_token(Some(login.token.clone()));
        Ok(login)
    }

    /// Check whether the current token is still accepted.
    ///
    /// A rejected token yields `Ok(false)` rather than an error.
    pub async fn verify_token(&self) -> SbResult<bool> {
        if !self.has_token() {
            return Ok(false);
        }
        match self.get_json::<VerifyResponse>("/auth/verify").await {
            Ok(resp) => Ok(resp.valid),
            Err(SbError::AuthFailed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
