//! Pure Supabase REST client.
//!
//! A minimal client for a hosted Supabase project: PostgREST table queries
//! (`/rest/v1`) and GoTrue sign-up (`/auth/v1`). No domain logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use supabase_client::SupabaseClient;
//!
//! let client = SupabaseClient::from_env()?;
//!
//! let rows: Vec<serde_json::Value> = client
//!     .from("profiles")
//!     .select("*, organizations(*)")
//!     .eq("id", user_id)
//!     .execute()
//!     .await?;
//! ```

pub mod auth;
pub mod error;
pub mod query;

pub use auth::AuthUser;
pub use error::{ErrorKind, Result, SupabaseError};
pub use query::{Relation, TableQuery};

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};

/// Supabase project client.
#[derive(Clone)]
pub struct SupabaseClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    /// Create a client for the project at `url` (e.g. `https://xyz.supabase.co`).
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create from environment variables `SUPABASE_URL` and `SUPABASE_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| SupabaseError::Config(format!("{} not set", name)))
        };
        Ok(Self::new(var("SUPABASE_URL")?, var("SUPABASE_KEY")?))
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SupabaseError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a query against a table or view.
    pub fn from(&self, relation: &str) -> TableQuery<'_> {
        TableQuery::new(self, relation)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
