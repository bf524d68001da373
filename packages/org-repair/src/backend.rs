// Backend trait for dependency injection
//
// The routines only ever talk to a BaseBackend handed to them, so tests can
// swap in MockBackend (see testing.rs) for the Supabase project.

use async_trait::async_trait;
use supabase_client::{AuthUser, Result, SupabaseClient, SupabaseError, TableQuery};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    LinkedProfile, NewOrganization, Organization, Profile, ProfileLink, ProfilePayload, User,
};

pub const ORGANIZATIONS: &str = "organizations";
pub const PROFILES: &str = "profiles";

/// Profile columns plus the embedded organization row
pub const LINKED_PROFILE_COLUMNS: &str = "*, organizations(*)";

// =============================================================================
// Backend Trait (Infrastructure - rows in the hosted project)
// =============================================================================

#[async_trait]
pub trait BaseBackend: Send + Sync {
    /// Relation identity records are read from, for messages
    fn users_relation(&self) -> &str;

    /// Look up an identity record by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up an organization by slug
    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    /// Insert an organization and return the stored row
    async fn insert_organization(&self, organization: &NewOrganization) -> Result<Organization>;

    /// Register an email/password account
    async fn sign_up(&self, email: &str, password: &str) -> Result<User>;

    /// Look up the profile sharing the user's id
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    async fn insert_profile(&self, profile: &ProfilePayload) -> Result<()>;

    /// Patch organization, role and name onto the profile with this id
    async fn link_profile(&self, user_id: Uuid, link: &ProfileLink) -> Result<()>;

    /// Overwrite the profile with `profile.id` using the full payload
    async fn update_profile(&self, profile: &ProfilePayload) -> Result<()>;

    /// Read the user's profile with its organization embedded
    async fn find_linked_profiles(&self, user_id: Uuid) -> Result<Vec<LinkedProfile>>;
}

// =============================================================================
// Supabase implementation
// =============================================================================

pub struct SupabaseBackend {
    client: SupabaseClient,
    users_relation: String,
}

impl SupabaseBackend {
    pub fn new(client: SupabaseClient, users_relation: impl Into<String>) -> Self {
        Self {
            client,
            users_relation: users_relation.into(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = SupabaseClient::new(&config.supabase_url, &config.supabase_key)
            .with_timeout(config.http_timeout)?;

        Ok(Self::new(client, &config.users_relation))
    }

    // Queries are built apart from execution so their shape can be checked
    // without a live project.

    fn user_by_email(&self, email: &str) -> TableQuery<'_> {
        self.client
            .from(&self.users_relation)
            .select("id, email")
            .eq("email", email)
    }

    fn organization_by_slug(&self, slug: &str) -> TableQuery<'_> {
        self.client.from(ORGANIZATIONS).eq("slug", slug)
    }

    fn organization_insert(&self, organization: &NewOrganization) -> Result<TableQuery<'_>> {
        self.client.from(ORGANIZATIONS).insert(organization)
    }

    fn profile_by_id(&self, user_id: Uuid) -> TableQuery<'_> {
        self.client.from(PROFILES).eq("id", user_id)
    }

    fn profile_insert(&self, profile: &ProfilePayload) -> Result<TableQuery<'_>> {
        self.client.from(PROFILES).insert(profile)
    }

    fn profile_link(&self, user_id: Uuid, link: &ProfileLink) -> Result<TableQuery<'_>> {
        Ok(self.client.from(PROFILES).update(link)?.eq("id", user_id))
    }

    fn profile_update(&self, profile: &ProfilePayload) -> Result<TableQuery<'_>> {
        Ok(self.client.from(PROFILES).update(profile)?.eq("id", profile.id))
    }

    fn linked_profiles(&self, user_id: Uuid) -> TableQuery<'_> {
        self.client
            .from(PROFILES)
            .select(LINKED_PROFILE_COLUMNS)
            .eq("id", user_id)
    }
}

/// Map a GoTrue sign-up answer to a user, turning the placeholder GoTrue
/// returns for an already registered address into a conflict.
pub fn account_from_sign_up(user: AuthUser) -> Result<User> {
    if user.is_existing_account() {
        info!(email = ?user.email, "Sign-up answered with a placeholder for an existing account");
        return Err(SupabaseError::api(
            422,
            "user_already_exists",
            "User already registered",
        ));
    }

    Ok(User {
        id: user.id,
        email: user.email,
    })
}

#[async_trait]
impl BaseBackend for SupabaseBackend {
    fn users_relation(&self) -> &str {
        &self.users_relation
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let rows: Vec<User> = self.user_by_email(email).execute().await?;
        Ok(rows.into_iter().next())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let rows: Vec<Organization> = self.organization_by_slug(slug).execute().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_organization(&self, organization: &NewOrganization) -> Result<Organization> {
        let rows: Vec<Organization> = self.organization_insert(organization)?.execute().await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::Parse("Organization insert returned no row".into()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let user = self.client.sign_up(email, password).await?;
        account_from_sign_up(user)
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let rows: Vec<Profile> = self.profile_by_id(user_id).execute().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &ProfilePayload) -> Result<()> {
        self.profile_insert(profile)?
            .execute::<serde_json::Value>()
            .await?;

        Ok(())
    }

    async fn link_profile(&self, user_id: Uuid, link: &ProfileLink) -> Result<()> {
        self.profile_link(user_id, link)?
            .execute::<serde_json::Value>()
            .await?;

        Ok(())
    }

    async fn update_profile(&self, profile: &ProfilePayload) -> Result<()> {
        self.profile_update(profile)?
            .execute::<serde_json::Value>()
            .await?;

        Ok(())
    }

    async fn find_linked_profiles(&self, user_id: Uuid) -> Result<Vec<LinkedProfile>> {
        self.linked_profiles(user_id).execute().await
    }
}
