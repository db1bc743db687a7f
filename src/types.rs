//! Common types and data structures

use serde::{Deserialize, Serialize};

/// User record as returned by the remote collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Fields the UI does not use (username, address, company, website, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Request body for create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Editable form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Form field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("name is required")]
    MissingName,
    #[error("email is required")]
    MissingEmail,
    #[error("email is not a valid address")]
    InvalidEmail,
    #[error("phone is required")]
    MissingPhone,
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Required-field checks plus the shape check an email input performs.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingName);
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(FormError::MissingEmail);
        }
        if !looks_like_email(email) {
            return Err(FormError::InvalidEmail);
        }
        if self.phone.trim().is_empty() {
            return Err(FormError::MissingPhone);
        }
        Ok(())
    }

    pub fn to_payload(&self) -> UserPayload {
        UserPayload {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.chars().any(char::is_whitespace)
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
