//! How a failed create is interpreted.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use supabase_client::{ErrorKind, SupabaseError};

/// Decides whether a failed insert or sign-up means "it already exists"
/// and the existing row should be looked up instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// Only a confirmed duplicate (unique violation, existing account)
    /// falls back to the lookup. Other failures propagate.
    #[default]
    Strict,
    /// Any failure falls back to the lookup.
    Lenient,
}

impl ConflictPolicy {
    pub fn treats_as_existing(self, err: &SupabaseError) -> bool {
        match self {
            Self::Strict => err.kind() == ErrorKind::Conflict,
            Self::Lenient => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => anyhow::bail!("Unknown conflict policy '{}' (expected strict or lenient)", other),
        }
    }
}
