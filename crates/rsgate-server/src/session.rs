//! Attribute-map sessions.
//!
//! A minimal session model for embedding applications that keep the
//! logged-in user as a named attribute (by default `userLoginId`).

use std::collections::HashMap;

use rsgate_domain::evaluator::SessionIdentityAdapter;
use rsgate_domain::model::UserIdentity;

/// Name of the attribute holding the logged-in user id by default.
pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "userLoginId";

/// String attributes of one user session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAttributes {
    attributes: HashMap<String, String>,
}

impl SessionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }
}

/// Reads the user identity from a configured session attribute.
///
/// A missing or blank attribute means the session is anonymous.
#[derive(Debug, Clone)]
pub struct AttributeIdentityAdapter {
    attribute: String,
}

impl Default for AttributeIdentityAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_ATTRIBUTE)
    }
}

impl AttributeIdentityAdapter {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// The attribute this adapter reads.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl SessionIdentityAdapter for AttributeIdentityAdapter {
    type Session = SessionAttributes;

    fn identity_of(&self, session: &SessionAttributes) -> Option<UserIdentity> {
        let value = session.get(&self.attribute)?.trim();
        UserIdentity::new(value).ok()
    }
}
