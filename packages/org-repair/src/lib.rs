//! Diagnose and repair user/organization links in a Supabase project.
//!
//! Two routines share one injected [`BaseBackend`]:
//!
//! - [`diagnose_user_organization`] checks the user, the organization and
//!   the profile linking them, and inserts or patches the profile.
//! - [`create_test_data`] creates the organization, the account and the
//!   profile, reusing rows that already exist.
//!
//! # Example
//!
//! ```rust,ignore
//! use org_repair::{Config, Console, SupabaseBackend, diagnose_user_organization};
//!
//! let config = Config::from_env()?;
//! let backend = SupabaseBackend::from_config(&config)?;
//! let mut console = Console::stdout();
//!
//! diagnose_user_organization(&backend, &config.target, &mut console).await?;
//! ```

pub mod backend;
pub mod config;
pub mod diagnose;
pub mod models;
pub mod policy;
pub mod report;
pub mod seed;
pub mod testing;

pub use backend::{BaseBackend, SupabaseBackend};
pub use config::{Config, RepairTarget};
pub use diagnose::{diagnose_user_organization, verify_link, DiagnosisOutcome};
pub use models::{LinkedProfile, NewOrganization, Organization, Profile, ProfilePayload, User};
pub use policy::ConflictPolicy;
pub use report::{Console, Marker};
pub use seed::{create_test_data, ProfileWrite, SeedOutcome};
