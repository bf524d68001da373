//! Testing utilities including a mock backend.
//!
//! `MockBackend` keeps users, organizations and profiles in memory, behaves
//! like the hosted project for duplicates (unique violations, existing
//! accounts), and records every call for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use supabase_client::{Result, SupabaseError};
use uuid::Uuid;

use crate::backend::BaseBackend;
use crate::config::DEFAULT_USERS_RELATION;
use crate::models::{
    LinkedProfile, NewOrganization, Organization, Profile, ProfileLink, ProfilePayload, User,
};

/// Backend operations, used to queue failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindUser,
    FindOrganization,
    InsertOrganization,
    SignUp,
    FindProfile,
    InsertProfile,
    LinkProfile,
    UpdateProfile,
    FindLinkedProfiles,
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    FindUser { email: String },
    FindOrganization { slug: String },
    InsertOrganization(NewOrganization),
    SignUp { email: String },
    FindProfile { user_id: Uuid },
    InsertProfile(ProfilePayload),
    LinkProfile { user_id: Uuid, link: ProfileLink },
    UpdateProfile(ProfilePayload),
    FindLinkedProfiles { user_id: Uuid },
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::FindUser { .. } => Operation::FindUser,
            Self::FindOrganization { .. } => Operation::FindOrganization,
            Self::InsertOrganization(_) => Operation::InsertOrganization,
            Self::SignUp { .. } => Operation::SignUp,
            Self::FindProfile { .. } => Operation::FindProfile,
            Self::InsertProfile(_) => Operation::InsertProfile,
            Self::LinkProfile { .. } => Operation::LinkProfile,
            Self::UpdateProfile(_) => Operation::UpdateProfile,
            Self::FindLinkedProfiles { .. } => Operation::FindLinkedProfiles,
        }
    }

    /// True for calls that change rows.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::InsertOrganization(_)
                | Self::SignUp { .. }
                | Self::InsertProfile(_)
                | Self::LinkProfile { .. }
                | Self::UpdateProfile(_)
        )
    }
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    organizations: Vec<Organization>,
    profiles: Vec<Profile>,
    failures: HashMap<Operation, VecDeque<SupabaseError>>,
    calls: Vec<BackendCall>,
}

/// In-memory stand-in for the Supabase project.
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
    users_relation: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            users_relation: DEFAULT_USERS_RELATION.to_string(),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users_relation(mut self, relation: impl Into<String>) -> Self {
        self.users_relation = relation.into();
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn with_organization(self, organization: Organization) -> Self {
        self.state.lock().unwrap().organizations.push(organization);
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.state.lock().unwrap().profiles.push(profile);
        self
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Several failures for the same operation are returned in order.
    pub fn fail_next(self, operation: Operation, error: SupabaseError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that changed (or tried to change) rows.
    pub fn writes(&self) -> Vec<BackendCall> {
        self.calls().into_iter().filter(BackendCall::is_write).collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn organization(&self, slug: &str) -> Option<Organization> {
        self.state
            .lock()
            .unwrap()
            .organizations
            .iter()
            .find(|o| o.slug == slug)
            .cloned()
    }

    pub fn user(&self, email: &str) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()
    }

    /// Record the call and pop a queued failure for it, if any.
    fn begin(&self, call: BackendCall) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let operation = call.operation();
        state.calls.push(call);

        match state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn duplicate(constraint: &str) -> SupabaseError {
    SupabaseError::api(
        409,
        supabase_client::error::UNIQUE_VIOLATION,
        format!("duplicate key value violates unique constraint \"{}\"", constraint),
    )
}

fn apply(profile: &mut Profile, organization_id: Uuid, role: &str, full_name: &str) {
    profile.organization_id = Some(organization_id);
    profile.role = role.to_string();
    profile.full_name = Some(full_name.to_string());
}

#[async_trait]
impl BaseBackend for MockBackend {
    fn users_relation(&self) -> &str {
        &self.users_relation
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.begin(BackendCall::FindUser {
            email: email.to_string(),
        })?;
        Ok(self.user(email))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        self.begin(BackendCall::FindOrganization {
            slug: slug.to_string(),
        })?;
        Ok(self.organization(slug))
    }

    async fn insert_organization(&self, organization: &NewOrganization) -> Result<Organization> {
        self.begin(BackendCall::InsertOrganization(organization.clone()))?;

        let mut state = self.state.lock().unwrap();
        if state
            .organizations
            .iter()
            .any(|o| o.slug == organization.slug)
        {
            return Err(duplicate("organizations_slug_key"));
        }

        let row = Organization {
            id: Uuid::new_v4(),
            name: organization.name.clone(),
            slug: organization.slug.clone(),
            created_at: Some(chrono::Utc::now()),
        };
        state.organizations.push(row.clone());
        Ok(row)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<User> {
        self.begin(BackendCall::SignUp {
            email: email.to_string(),
        })?;

        let mut state = self.state.lock().unwrap();
        if state
            .users
            .iter()
            .any(|u| u.email.as_deref() == Some(email))
        {
            return Err(SupabaseError::api(
                422,
                "user_already_exists",
                "User already registered",
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.begin(BackendCall::FindProfile { user_id })?;
        Ok(self.profile(user_id))
    }

    async fn insert_profile(&self, profile: &ProfilePayload) -> Result<()> {
        self.begin(BackendCall::InsertProfile(profile.clone()))?;

        let mut state = self.state.lock().unwrap();
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(duplicate("profiles_pkey"));
        }

        state.profiles.push(Profile {
            id: profile.id,
            organization_id: Some(profile.organization_id),
            role: profile.role.clone(),
            full_name: Some(profile.full_name.clone()),
            invited_by: None,
            created_at: Some(chrono::Utc::now()),
        });
        Ok(())
    }

    async fn link_profile(&self, user_id: Uuid, link: &ProfileLink) -> Result<()> {
        self.begin(BackendCall::LinkProfile {
            user_id,
            link: link.clone(),
        })?;

        // PATCH matching no row is not an error for PostgREST
        let mut state = self.state.lock().unwrap();
        if let Some(profile) = state.profiles.iter_mut().find(|p| p.id == user_id) {
            apply(profile, link.organization_id, &link.role, &link.full_name);
        }
        Ok(())
    }

    async fn update_profile(&self, payload: &ProfilePayload) -> Result<()> {
        self.begin(BackendCall::UpdateProfile(payload.clone()))?;

        let mut state = self.state.lock().unwrap();
        if let Some(profile) = state.profiles.iter_mut().find(|p| p.id == payload.id) {
            apply(
                profile,
                payload.organization_id,
                &payload.role,
                &payload.full_name,
            );
        }
        Ok(())
    }

    async fn find_linked_profiles(&self, user_id: Uuid) -> Result<Vec<LinkedProfile>> {
        self.begin(BackendCall::FindLinkedProfiles { user_id })?;

        let state = self.state.lock().unwrap();
        let rows = state
            .profiles
            .iter()
            .filter(|p| p.id == user_id)
            .map(|p| LinkedProfile {
                profile: p.clone(),
                organizations: p.organization_id.and_then(|org_id| {
                    state
                        .organizations
                        .iter()
                        .find(|o| o.id == org_id)
                        .cloned()
                }),
            })
            .collect();
        Ok(rows)
    }
}
