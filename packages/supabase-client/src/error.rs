//! Error types for the Supabase client.

use serde::Deserialize;
use thiserror::Error;

/// Result type for Supabase client operations.
pub type Result<T> = std::result::Result<T, SupabaseError>;

/// Postgres unique violation, surfaced by PostgREST on duplicate inserts.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres foreign key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres check constraint violation.
pub const CHECK_VIOLATION: &str = "23514";
/// Postgres undefined table.
pub const UNDEFINED_TABLE: &str = "42P01";
/// Postgres insufficient privilege (row level security, grants).
pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
/// PostgREST: singular response requested but zero rows matched.
pub const NO_ROWS: &str = "PGRST116";
/// PostgREST: relation missing from the schema cache.
pub const UNKNOWN_RELATION: &str = "PGRST205";

const JWT_ERRORS: [&str; 2] = ["PGRST301", "PGRST302"];
const AUTH_DUPLICATE_CODES: [&str; 2] = ["user_already_exists", "email_exists"];
const AUTH_DUPLICATE_MESSAGE: &str = "User already registered";

/// Coarse classification of a failure.
///
/// Callers use this to decide whether a failed write means "the row is
/// already there" instead of matching on raw codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lookup matched nothing where a row was required
    NotFound,
    /// Unique constraint or duplicate account
    Conflict,
    /// Bad key, expired JWT, RLS or grant refusal
    Unauthorized,
    /// Connection, DNS, TLS or timeout
    Transport,
    /// Local misuse or an unexpected response shape
    Malformed,
    /// Anything else the server refused
    Rejected,
}

/// Supabase client errors.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// Configuration error (missing URL or key, unsafe query)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from PostgREST or GoTrue
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SupabaseError {
    /// Build an API error by hand. Mostly useful for test doubles.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: Some(code.into()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Build an API error from a failed response body.
    ///
    /// Understands both the PostgREST shape (`code`, `message`, `details`,
    /// `hint`) and the GoTrue shape (`error_code`, `msg`). Bodies that are
    /// not JSON are kept verbatim as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        let code = parsed.error_code.or(match parsed.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        });

        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| body.trim().to_string());

        Self::Api {
            status,
            code,
            message,
            details: parsed.details,
            hint: parsed.hint,
        }
    }

    /// Machine-readable code, when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Transport,
            Self::Config(_) | Self::Parse(_) => ErrorKind::Malformed,
            Self::Api {
                status,
                code,
                message,
                ..
            } => classify(*status, code.as_deref(), message),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

fn classify(status: u16, code: Option<&str>, message: &str) -> ErrorKind {
    match code {
        Some(UNIQUE_VIOLATION) => return ErrorKind::Conflict,
        Some(c) if AUTH_DUPLICATE_CODES.contains(&c) => return ErrorKind::Conflict,
        Some(NO_ROWS) => return ErrorKind::NotFound,
        Some(INSUFFICIENT_PRIVILEGE) => return ErrorKind::Unauthorized,
        Some(c) if JWT_ERRORS.contains(&c) => return ErrorKind::Unauthorized,
        // A missing table answers 404 but is a setup problem, not an absent row
        Some(UNDEFINED_TABLE) | Some(UNKNOWN_RELATION) => return ErrorKind::Rejected,
        _ => {}
    }

    if message.eq_ignore_ascii_case(AUTH_DUPLICATE_MESSAGE) {
        return ErrorKind::Conflict;
    }

    match status {
        401 | 403 => ErrorKind::Unauthorized,
        // PostgREST also answers 409 for foreign key violations, so the
        // status alone only counts when the server sent no code
        _ if code.is_some() => ErrorKind::Rejected,
        409 => ErrorKind::Conflict,
        404 => ErrorKind::NotFound,
        _ => ErrorKind::Rejected,
    }
}

/// Union of the PostgREST and GoTrue error bodies.
///
/// GoTrue sends `code` as the numeric HTTP status, PostgREST as a string,
/// hence the untyped field.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_duplicate_is_conflict() {
        let body = r#"{"code":"23505","details":"Key (slug)=(tech-solutions) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"organizations_slug_key\""}"#;
        let err = SupabaseError::from_response(409, body);

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), Some("23505"));
        assert!(err.to_string().contains("organizations_slug_key"));
        match err {
            SupabaseError::Api { details, hint, .. } => {
                assert_eq!(
                    details.as_deref(),
                    Some("Key (slug)=(tech-solutions) already exists.")
                );
                assert!(hint.is_none());
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_gotrue_duplicate_is_conflict() {
        let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
        let err = SupabaseError::from_response(422, body);

        assert_eq!(err.code(), Some("user_already_exists"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_legacy_gotrue_message_is_conflict() {
        let body = r#"{"code":400,"msg":"User already registered"}"#;
        let err = SupabaseError::from_response(400, body);

        assert_eq!(err.code(), None);
        assert!(err.is_conflict());
    }

    #[test]
    fn test_permission_denied_is_not_conflict() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"new row violates row-level security policy for table \"organizations\""}"#;
        let err = SupabaseError::from_response(403, body);

        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_missing_relation_is_rejected_not_not_found() {
        let body = r#"{"code":"PGRST205","details":null,"hint":"Perhaps you meant the table 'public.profiles'","message":"Could not find the table 'public.users' in the schema cache"}"#;
        let err = SupabaseError::from_response(404, body);

        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_foreign_key_409_is_not_conflict() {
        let body = r#"{"code":"23503","details":"Key (organization_id)=(6a1d) is not present in table \"organizations\".","hint":null,"message":"insert or update on table \"profiles\" violates foreign key constraint \"profiles_organization_id_fkey\""}"#;
        let err = SupabaseError::from_response(409, body);

        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_status_fallbacks() {
        assert_eq!(SupabaseError::from_response(409, "").kind(), ErrorKind::Conflict);
        assert_eq!(SupabaseError::from_response(404, "").kind(), ErrorKind::NotFound);
        assert_eq!(
            SupabaseError::from_response(401, "").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(SupabaseError::from_response(500, "").kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_plain_text_body_kept_as_message() {
        let err = SupabaseError::from_response(502, "Bad Gateway\n");

        assert_eq!(err.to_string(), "API error (502): Bad Gateway");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_local_errors() {
        assert_eq!(
            SupabaseError::Network("timed out".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            SupabaseError::Parse("eof".into()).kind(),
            ErrorKind::Malformed
        );
        assert_eq!(SupabaseError::Network("x".into()).status(), None);
    }
}
