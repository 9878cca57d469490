//! User record and its request payload

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A row of the `user` table
///
/// `id` is assigned by the database; it is `0` on records that were never
/// read back (create and update echo the submitted payload).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default)]
    pub id: i32,
    pub firstname: String,
    pub lastname: String,
    pub address: String,
    pub phone: String,
}

impl User {
    /// Record keyed only by name, as used by delete
    pub fn named(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            firstname: firstname.into(),
            lastname: lastname.into(),
            ..Self::default()
        }
    }
}

/// Body of `POST /user` and `PUT /user/{id}`
///
/// `Firstname` and `Lastname` are required because update and delete are
/// keyed on them. `Address` and `Phone` default to empty strings. A
/// client-supplied `Id` is echoed back but never written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPayload {
    #[serde(default)]
    pub id: Option<i32>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl UserPayload {
    /// Decode a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Check required fields and build the record handed to the store
    pub fn validate(self) -> Result<User, ValidationError> {
        let firstname = required("Firstname", self.firstname)?;
        let lastname = required("Lastname", self.lastname)?;

        Ok(User {
            id: self.id.unwrap_or_default(),
            firstname,
            lastname,
            address: self.address.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::Missing { field }),
    }
}
