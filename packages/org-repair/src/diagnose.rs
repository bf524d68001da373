//! Diagnose and repair the user → profile → organization link.

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::BaseBackend;
use crate::config::RepairTarget;
use crate::report::Console;

/// Where the diagnostic routine ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisOutcome {
    /// No identity record for the email; nothing else was touched
    UserNotFound,
    /// No organization for the slug; nothing else was touched
    OrganizationNotFound,
    /// Profile was missing and has been inserted
    ProfileCreated,
    /// Profile had no organization and has been patched
    ProfileLinked,
    /// Profile was already linked; no write issued
    AlreadyLinked,
    /// The repair write failed (reported, not raised)
    RepairFailed,
}

/// Check that the configured user has a profile linked to the configured
/// organization, creating or patching the profile when it is not.
///
/// An absent user or organization ends the routine with a printed message.
/// A failed repair write is printed and the final check still runs. Lookup
/// failures (network, permissions) are returned as errors.
pub async fn diagnose_user_organization<W: Write>(
    backend: &dyn BaseBackend,
    target: &RepairTarget,
    console: &mut Console<W>,
) -> Result<DiagnosisOutcome> {
    // 1. User
    console.section("Vérification de l'utilisateur");
    let user = backend
        .find_user_by_email(&target.email)
        .await
        .context("Failed to look up user")?;
    console.rows("Utilisateur trouvé", user.as_slice());

    let Some(user) = user else {
        console.failure(format!(
            "L'utilisateur n'existe pas dans {}",
            backend.users_relation()
        ));
        return Ok(DiagnosisOutcome::UserNotFound);
    };

    // 2. Organization
    console.section("Vérification de l'organisation");
    let organization = backend
        .find_organization_by_slug(&target.org_slug)
        .await
        .context("Failed to look up organization")?;
    console.rows("Organisation trouvée", organization.as_slice());

    let Some(organization) = organization else {
        console.failure("L'organisation n'existe pas");
        return Ok(DiagnosisOutcome::OrganizationNotFound);
    };

    // 3. Profile
    console.section("Vérification du profil");
    let profile = backend
        .find_profile(user.id)
        .await
        .context("Failed to look up profile")?;
    console.rows("Profil trouvé", profile.as_slice());

    let payload = target.profile_payload(user.id, organization.id);

    let outcome = match profile {
        None => {
            console.failure("Le profil n'existe pas");
            console.line("Création du profil...");
            match backend.insert_profile(&payload).await {
                Ok(()) => {
                    info!(user_id = %user.id, organization_id = %organization.id, "Profile created");
                    console.success("Profil créé avec succès");
                    DiagnosisOutcome::ProfileCreated
                }
                Err(err) => {
                    warn!(error = %err, error_kind = ?err.kind(), "Profile insert failed");
                    console.failure(format!("Erreur lors de la création du profil: {}", err));
                    console.explain(&err);
                    DiagnosisOutcome::RepairFailed
                }
            }
        }
        Some(profile) if !profile.is_linked() => {
            console.failure("Le profil n'a pas d'organization_id");
            console.line("Mise à jour du profil...");
            match backend.link_profile(user.id, &payload.link()).await {
                Ok(()) => {
                    info!(user_id = %user.id, organization_id = %organization.id, "Profile linked");
                    console.success("Profil mis à jour avec succès");
                    DiagnosisOutcome::ProfileLinked
                }
                Err(err) => {
                    warn!(error = %err, error_kind = ?err.kind(), "Profile update failed");
                    console.failure(format!("Erreur lors de la mise à jour du profil: {}", err));
                    console.explain(&err);
                    DiagnosisOutcome::RepairFailed
                }
            }
        }
        Some(_) => {
            console.success("Le profil a un organization_id");
            DiagnosisOutcome::AlreadyLinked
        }
    };

    // 4. Final link
    console.section("Vérification finale");
    print_linked_profiles(backend, user.id, "Liaison finale", console).await?;

    Ok(outcome)
}

/// Print the user's profile joined with its organization.
pub async fn print_linked_profiles<W: Write>(
    backend: &dyn BaseBackend,
    user_id: Uuid,
    label: &str,
    console: &mut Console<W>,
) -> Result<()> {
    let rows = backend
        .find_linked_profiles(user_id)
        .await
        .context("Failed to read linked profile")?;
    console.rows(label, &rows);
    Ok(())
}

/// Read-only check: print the configured user's profile and organization.
///
/// Returns whether the profile exists and points at an organization.
pub async fn verify_link<W: Write>(
    backend: &dyn BaseBackend,
    target: &RepairTarget,
    console: &mut Console<W>,
) -> Result<bool> {
    console.section("Vérification de la liaison");
    let user = backend
        .find_user_by_email(&target.email)
        .await
        .context("Failed to look up user")?;

    let Some(user) = user else {
        console.failure(format!(
            "L'utilisateur n'existe pas dans {}",
            backend.users_relation()
        ));
        return Ok(false);
    };

    let rows = backend
        .find_linked_profiles(user.id)
        .await
        .context("Failed to read linked profile")?;
    console.rows("Liaison actuelle", &rows);

    let linked = rows
        .iter()
        .any(|row| row.profile.is_linked() && row.organizations.is_some());
    if linked {
        console.success("Le profil est lié à une organisation");
    } else {
        console.failure("Le profil n'est lié à aucune organisation");
    }
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Organization, Profile, User};
    use crate::testing::{BackendCall, MockBackend, Operation};
    use supabase_client::SupabaseError;

    const USER_ID: Uuid = Uuid::from_u128(0x11);
    const ORG_ID: Uuid = Uuid::from_u128(0x22);

    fn target() -> RepairTarget {
        RepairTarget {
            email: "admin@tech-solutions.com".into(),
            org_slug: "tech-solutions".into(),
            org_name: Some("Tech Solutions Inc".into()),
            full_name: "Alex Johnson".into(),
            role: "admin".into(),
            password: None,
        }
    }

    fn user() -> User {
        User {
            id: USER_ID,
            email: Some("admin@tech-solutions.com".into()),
        }
    }

    fn organization() -> Organization {
        Organization {
            id: ORG_ID,
            name: "Tech Solutions Inc".into(),
            slug: "tech-solutions".into(),
            created_at: None,
        }
    }

    fn profile(organization_id: Option<Uuid>) -> Profile {
        Profile {
            id: USER_ID,
            organization_id,
            role: "member".into(),
            full_name: None,
            invited_by: None,
            created_at: None,
        }
    }

    async fn run(backend: &MockBackend) -> (DiagnosisOutcome, String) {
        let mut console = Console::new(Vec::new());
        let outcome = diagnose_user_organization(backend, &target(), &mut console)
            .await
            .unwrap();
        (outcome, String::from_utf8(console.into_inner()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_user_names_configured_relation() {
        let backend = MockBackend::new().with_users_relation("public.members");

        let (outcome, output) = run(&backend).await;
        assert_eq!(outcome, DiagnosisOutcome::UserNotFound);
        assert!(output.contains("❌ L'utilisateur n'existe pas dans public.members"));
        assert!(!output.contains("auth.users"));

        let mut console = Console::new(Vec::new());
        let linked = verify_link(&backend, &target(), &mut console).await.unwrap();
        assert!(!linked);
        let output = String::from_utf8(console.into_inner()).unwrap();
        assert!(output.contains("❌ L'utilisateur n'existe pas dans public.members"));
    }

    #[tokio::test]
    async fn test_missing_organization_stops_before_profile() {
        let backend = MockBackend::new().with_user(user());

        let (outcome, output) = run(&backend).await;

        assert_eq!(outcome, DiagnosisOutcome::OrganizationNotFound);
        assert!(output.contains("❌ L'organisation n'existe pas"));
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::FindUser {
                    email: "admin@tech-solutions.com".into()
                },
                BackendCall::FindOrganization {
                    slug: "tech-solutions".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unlinked_profile_is_patched() {
        let backend = MockBackend::new()
            .with_user(user())
            .with_organization(organization())
            .with_profile(profile(None));

        let (outcome, output) = run(&backend).await;

        assert_eq!(outcome, DiagnosisOutcome::ProfileLinked);
        assert!(output.contains("❌ Le profil n'a pas d'organization_id"));
        assert!(output.contains("✅ Profil mis à jour avec succès"));
        assert_eq!(backend.count(Operation::InsertProfile), 0);

        let patched = backend.profile(USER_ID).unwrap();
        assert_eq!(patched.organization_id, Some(ORG_ID));
        assert_eq!(patched.role, "admin");
        assert_eq!(patched.full_name.as_deref(), Some("Alex Johnson"));
    }

    #[tokio::test]
    async fn test_failed_patch_is_reported_and_final_check_runs() {
        let backend = MockBackend::new()
            .with_user(user())
            .with_organization(organization())
            .with_profile(profile(None))
            .fail_next(
                Operation::LinkProfile,
                SupabaseError::api(403, "42501", "permission denied for table profiles"),
            );

        let (outcome, output) = run(&backend).await;

        assert_eq!(outcome, DiagnosisOutcome::RepairFailed);
        assert!(output.contains("❌ Erreur lors de la mise à jour du profil"));
        assert!(output.contains("Permission refusée"));
        assert_eq!(backend.count(Operation::FindLinkedProfiles), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let backend = MockBackend::new().fail_next(
            Operation::FindUser,
            SupabaseError::Network("connection refused".into()),
        );
        let mut console = Console::new(Vec::new());

        let err = diagnose_user_organization(&backend, &target(), &mut console)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to look up user"));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_link() {
        let backend = MockBackend::new()
            .with_user(user())
            .with_organization(organization())
            .with_profile(profile(Some(ORG_ID)));
        let mut console = Console::new(Vec::new());

        let linked = verify_link(&backend, &target(), &mut console).await.unwrap();

        assert!(linked);
        assert!(backend.writes().is_empty());
        let output = String::from_utf8(console.into_inner()).unwrap();
        assert!(output.contains("✅ Le profil est lié à une organisation"));
    }

    #[tokio::test]
    async fn test_verify_link_with_dangling_organization() {
        let backend = MockBackend::new()
            .with_user(user())
            .with_profile(profile(Some(ORG_ID)));
        let mut console = Console::new(Vec::new());

        let linked = verify_link(&backend, &target(), &mut console).await.unwrap();

        assert!(!linked);
    }
}
