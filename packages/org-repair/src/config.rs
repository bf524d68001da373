use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{NewOrganization, ProfilePayload};
use crate::policy::ConflictPolicy;

pub const DEFAULT_ROLE: &str = "admin";
pub const DEFAULT_USERS_RELATION: &str = "auth.users";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    /// Relation holding identity records, schema-qualified
    pub users_relation: String,
    pub http_timeout: Duration,
    pub conflict_policy: ConflictPolicy,
    pub target: RepairTarget,
}

/// The user, organization and profile values the routines converge on.
#[derive(Clone, PartialEq)]
pub struct RepairTarget {
    pub email: String,
    pub org_slug: String,
    /// Only needed to create the organization
    pub org_name: Option<String>,
    pub full_name: String,
    pub role: String,
    /// Only needed to create the account
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let var = |name: &str| raw(name).map(|value| value.trim().to_string());
        let required = |name: &str| var(name).with_context(|| format!("{} must be set", name));

        let timeout_secs = var("REPAIR_HTTP_TIMEOUT_SECS")
            .map(|secs| secs.parse::<u64>())
            .transpose()
            .context("REPAIR_HTTP_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow::anyhow!("zero-length timeout"))
                .context("REPAIR_HTTP_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_key: required("SUPABASE_KEY")?,
            users_relation: var("REPAIR_USERS_RELATION")
                .unwrap_or_else(|| DEFAULT_USERS_RELATION.to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            conflict_policy: var("REPAIR_CONFLICT_POLICY")
                .map(|policy| policy.parse::<ConflictPolicy>())
                .transpose()?
                .unwrap_or_default(),
            target: RepairTarget {
                email: required("REPAIR_ADMIN_EMAIL")?,
                org_slug: required("REPAIR_ORG_SLUG")?,
                org_name: var("REPAIR_ORG_NAME"),
                full_name: required("REPAIR_FULL_NAME")?,
                role: var("REPAIR_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
                password: raw("REPAIR_ADMIN_PASSWORD"),
            },
        })
    }
}

impl RepairTarget {
    pub fn profile_payload(&self, user_id: Uuid, organization_id: Uuid) -> ProfilePayload {
        ProfilePayload {
            id: user_id,
            organization_id,
            role: self.role.clone(),
            full_name: self.full_name.clone(),
        }
    }

    pub fn new_organization(&self) -> Result<NewOrganization> {
        let name = self
            .org_name
            .clone()
            .context("REPAIR_ORG_NAME must be set to create the organization")?;

        Ok(NewOrganization {
            name,
            slug: self.org_slug.clone(),
        })
    }

    pub fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .context("REPAIR_ADMIN_PASSWORD must be set to create the account")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("users_relation", &self.users_relation)
            .field("http_timeout", &self.http_timeout)
            .field("conflict_policy", &self.conflict_policy)
            .field("target", &self.target)
            .finish()
    }
}

impl fmt::Debug for RepairTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepairTarget")
            .field("email", &self.email)
            .field("org_slug", &self.org_slug)
            .field("org_name", &self.org_name)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
