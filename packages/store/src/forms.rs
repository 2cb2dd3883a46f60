//! Field binding for the sign-in, sign-up, and add-link forms.
//!
//! Only presence is checked here. Everything else (URL format, password strength,
//! duplicate accounts) is left to the backend and reported back as its message.

use crate::error::ValidationError;
use crate::models::NewLink;

/// Email and password as typed into the sign-in or sign-up form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

impl CredentialsForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns the trimmed email and the password untouched.
    pub fn validate(&self) -> Result<(String, String), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok((email.to_string(), self.password.clone()))
    }
}

/// Raw contents of the add-link form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkForm {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Comma-separated.
    pub tags: String,
    pub favorite: bool,
}

impl LinkForm {
    /// Build the insert payload, or fail if the URL is missing.
    pub fn to_new_link(&self) -> Result<NewLink, ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        Ok(NewLink {
            url: url.to_string(),
            title: non_blank(&self.title),
            description: non_blank(&self.description),
            tags: parse_tags(&self.tags),
            favorite: self.favorite,
        })
    }
}

/// Blank input is absent, not an empty string. Anything else is kept as typed.
pub fn non_blank(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Split a comma-separated tag list into trimmed tags, keeping their order.
///
/// Returns `None` for blank input so the column is stored as `null` rather
/// than an empty array. Empty segments (`"a,,b"`) are skipped.
pub fn parse_tags(input: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}
