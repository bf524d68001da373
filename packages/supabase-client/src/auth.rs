//! GoTrue (Supabase Auth) endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, SupabaseError};
use crate::SupabaseClient;

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// User object returned by GoTrue.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub identities: Option<Vec<serde_json::Value>>,
}

impl AuthUser {
    /// With email confirmation enabled, GoTrue answers a sign-up for an
    /// address that is already registered with a placeholder user carrying
    /// an empty `identities` list instead of an error.
    pub fn is_existing_account(&self) -> bool {
        matches!(&self.identities, Some(identities) if identities.is_empty())
    }
}

/// Sign-up answers with a session when auto-confirm is on, with the bare
/// user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: AuthUser },
    User(AuthUser),
}

impl SignUpResponse {
    fn into_user(self) -> AuthUser {
        match self {
            Self::Session { user } | Self::User(user) => user,
        }
    }
}

impl SupabaseClient {
    /// Register an email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let url = format!("{}/auth/v1/signup", self.base_url);

        let response = self
            .request(Method::POST, &url)
            .json(&SignUpRequest { email, password })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "GoTrue sign-up request failed");
                SupabaseError::Network(e.to_string())
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "GoTrue sign-up");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SupabaseError::from_response(status.as_u16(), &body));
        }

        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| SupabaseError::Parse(format!("Failed to decode sign-up response: {}", e)))?;

        Ok(parsed.into_user())
    }
}
