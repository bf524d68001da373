//! Rows read from and written to the Supabase project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record (`auth.users`). Only read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `organizations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile is linked once it points at an organization.
    pub fn is_linked(&self) -> bool {
        self.organization_id.is_some()
    }
}

/// Full profile row written by insert, or by update in the seeding path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePayload {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub role: String,
    pub full_name: String,
}

impl ProfilePayload {
    pub fn link(&self) -> ProfileLink {
        ProfileLink {
            organization_id: self.organization_id,
            role: self.role.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Columns patched onto an existing profile that lost its organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileLink {
    pub organization_id: Uuid,
    pub role: String,
    pub full_name: String,
}

/// Profile with its organization embedded (`select=*, organizations(*)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedProfile {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default)]
    pub organizations: Option<Organization>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_without_organization() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "0b6f5f59-8a4e-4a53-9d3c-54a8d1b1d9f1",
            "organization_id": null,
            "role": "member",
            "full_name": null,
            "invited_by": null,
            "created_at": "2025-06-21T17:04:17.123456+00:00"
        }))
        .unwrap();

        assert!(!profile.is_linked());
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_linked_profile_embeds_organization() {
        let row: LinkedProfile = serde_json::from_value(json!({
            "id": "0b6f5f59-8a4e-4a53-9d3c-54a8d1b1d9f1",
            "organization_id": "6a1d1f0e-0d4c-4c1a-8a57-2f0c5f3e9b77",
            "role": "admin",
            "full_name": "Alex Johnson",
            "organizations": {
                "id": "6a1d1f0e-0d4c-4c1a-8a57-2f0c5f3e9b77",
                "name": "Tech Solutions Inc",
                "slug": "tech-solutions",
                "created_at": "2025-06-21T17:00:00+00:00"
            }
        }))
        .unwrap();

        assert!(row.profile.is_linked());
        assert_eq!(row.organizations.unwrap().slug, "tech-solutions");
    }

    #[test]
    fn test_payload_link_drops_id() {
        let payload = ProfilePayload {
            id: Uuid::from_u128(1),
            organization_id: Uuid::from_u128(2),
            role: "admin".into(),
            full_name: "Alex Johnson".into(),
        };

        let link = serde_json::to_value(payload.link()).unwrap();
        assert!(link.get("id").is_none());
        assert_eq!(link["role"], "admin");
    }
}
