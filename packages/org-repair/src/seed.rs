//! Seed the organization, account and profile the diagnostic expects.
//!
//! Every create is attempted first. When it fails, the [`ConflictPolicy`]
//! decides whether the failure means "already there", in which case the
//! existing row is looked up and used for the following steps.

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::BaseBackend;
use crate::config::RepairTarget;
use crate::diagnose::print_linked_profiles;
use crate::policy::ConflictPolicy;
use crate::report::Console;

/// How the profile ended up being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileWrite {
    Inserted,
    /// Insert failed as a duplicate, the existing row was overwritten
    Updated,
    /// Neither write went through (reported, not raised)
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub profile: ProfileWrite,
}

pub async fn create_test_data<W: Write>(
    backend: &dyn BaseBackend,
    target: &RepairTarget,
    policy: ConflictPolicy,
    console: &mut Console<W>,
) -> Result<SeedOutcome> {
    // Settings are checked before any remote call
    let new_organization = target.new_organization()?;
    let password = target.password()?;

    // 1. Organization
    console.section("Création de l'organisation");
    let organization_id = match backend.insert_organization(&new_organization).await {
        Ok(organization) => {
            info!(organization_id = %organization.id, slug = %organization.slug, "Organization created");
            console.success(format!("Organisation créée: {}", organization.id));
            organization.id
        }
        Err(err) => {
            console.failure(format!("Erreur création organisation: {}", err));
            console.explain(&err);
            if !policy.treats_as_existing(&err) {
                return Err(err).context("Failed to create organization");
            }
            warn!(error = %err, error_kind = ?err.kind(), %policy, "Organization insert failed, reading existing row");

            let existing = backend
                .find_organization_by_slug(&new_organization.slug)
                .await
                .context("Failed to look up existing organization")?
                .with_context(|| {
                    format!(
                        "Organization '{}' not found after failed insert",
                        new_organization.slug
                    )
                })?;
            console.info(format!("Organisation existante: {}", existing.id));
            existing.id
        }
    };

    // 2. Account
    console.section("Création de l'utilisateur auth");
    let user_id = match backend.sign_up(&target.email, password).await {
        Ok(user) => {
            info!(user_id = %user.id, "Account created");
            console.success(format!("Utilisateur auth créé: {}", user.id));
            user.id
        }
        Err(err) => {
            console.warning(format!("Erreur création utilisateur auth: {}", err));
            console.explain(&err);
            if !policy.treats_as_existing(&err) {
                return Err(err).context("Failed to create account");
            }
            warn!(error = %err, error_kind = ?err.kind(), %policy, "Sign-up failed, reading existing account");

            let existing = backend
                .find_user_by_email(&target.email)
                .await
                .context("Failed to look up existing account")?
                .with_context(|| {
                    format!("Account '{}' not found after failed sign-up", target.email)
                })?;
            console.info(format!("Utilisateur auth existant: {}", existing.id));
            existing.id
        }
    };

    // 3. Profile
    console.section("Création du profil");
    let payload = target.profile_payload(user_id, organization_id);
    let profile = match backend.insert_profile(&payload).await {
        Ok(()) => {
            info!(%user_id, %organization_id, "Profile created");
            console.success("Profil créé avec succès");
            ProfileWrite::Inserted
        }
        Err(err) if policy.treats_as_existing(&err) => {
            console.warning(format!("Erreur création profil: {}", err));
            match backend.update_profile(&payload).await {
                Ok(()) => {
                    info!(%user_id, %organization_id, "Existing profile updated");
                    console.success("Profil mis à jour avec succès");
                    ProfileWrite::Updated
                }
                Err(err) => {
                    warn!(error = %err, error_kind = ?err.kind(), "Profile update failed");
                    console.failure(format!("Erreur mise à jour profil: {}", err));
                    console.explain(&err);
                    ProfileWrite::Failed
                }
            }
        }
        Err(err) => {
            warn!(error = %err, error_kind = ?err.kind(), %policy, "Profile insert failed, not a duplicate");
            console.failure(format!("Erreur création profil: {}", err));
            console.explain(&err);
            ProfileWrite::Failed
        }
    };

    // 4. Final link
    console.section("Vérification finale");
    print_linked_profiles(backend, user_id, "Résultat final", console).await?;

    Ok(SeedOutcome {
        organization_id,
        user_id,
        profile,
    })
}
