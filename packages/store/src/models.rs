//! # Domain models for sessions, links, and profiles
//!
//! These types cross the boundary between the hosted backend and the UI. They are
//! `Serialize + Deserialize` so the HTTP client can decode rows straight into them
//! and the in-memory backend can store them as JSON.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`UserInfo`] | The identity carried by a session: backend-assigned id and email. |
//! | [`Session`] | Proof of authentication: the user, an access token, and optional refresh token / expiry. Shared as immutable `Arc<Session>` snapshots. |
//! | [`Link`] | A stored bookmark row as read back from the `links` collection. |
//! | [`NewLink`] | The insert payload built by the add-link form. |
//! | [`Profile`] | The row mirrored into the `profiles` collection right after sign-up. |
//!
//! [`LINK_COLUMNS`] lists the columns selected when listing links, and
//! [`CREATED_AT`] is the column they are ordered by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Columns fetched by the link list.
pub const LINK_COLUMNS: &[&str] = &[
    "id",
    "url",
    "title",
    "description",
    "tags",
    "favorite",
    "created_at",
];

/// Column holding the backend-assigned creation time.
pub const CREATED_AT: &str = "created_at";

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session. Replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserInfo,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at.is_some_and(|at| at - margin <= now)
    }
}

/// A stored link row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Link {
    /// Title to show in lists, falling back to the URL.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }

    /// Tags joined for display, or `None` when there are none.
    pub fn tag_line(&self) -> Option<String> {
        self.tags
            .as_ref()
            .filter(|tags| !tags.is_empty())
            .map(|tags| tags.join(", "))
    }
}

/// Insert payload for the `links` collection. Absent fields are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorite: bool,
}

/// Row inserted into the `profiles` collection after sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
}

/// Row ids are uuids or bigints depending on the schema.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_from_row() {
        let row = json!({
            "id": 42,
            "url": "https://example.com",
            "title": null,
            "description": "A site",
            "tags": ["rust", "web"],
            "favorite": true,
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        });
        let link: Link = serde_json::from_value(row).unwrap();
        assert_eq!(link.id, "42");
        assert_eq!(link.display_title(), "https://example.com");
        assert_eq!(link.tag_line().as_deref(), Some("rust, web"));
        assert!(link.favorite);
        assert!(link.created_at.is_some());
    }

    #[test]
    fn test_link_defaults_for_missing_columns() {
        let row = json!({ "id": "0b6f", "url": "https://a.dev" });
        let link: Link = serde_json::from_value(row).unwrap();
        assert!(!link.favorite);
        assert!(link.tags.is_none());
        assert!(link.tag_line().is_none());
        assert!(link.created_at.is_none());
    }

    #[test]
    fn test_new_link_sends_nulls() {
        let payload = NewLink {
            url: "https://a.dev".into(),
            title: None,
            description: None,
            tags: None,
            favorite: false,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "https://a.dev",
                "title": null,
                "description": null,
                "tags": null,
                "favorite": false
            })
        );
    }

    #[test]
    fn test_session_expiry_margin() {
        let now = Utc::now();
        let session = Session {
            user: UserInfo {
                id: "u1".into(),
                email: None,
            },
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(now + chrono::Duration::seconds(30)),
        };
        assert!(session.expires_within(now, chrono::Duration::seconds(60)));
        assert!(!session.expires_within(now, chrono::Duration::seconds(10)));

        let forever = Session {
            expires_at: None,
            ..session
        };
        assert!(!forever.expires_within(now, chrono::Duration::seconds(60)));
    }
}
