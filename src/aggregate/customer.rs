//! Customer Aggregate
//!
//! Profile data of an account owner. The e-mail address is where
//! transaction alerts are sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CustomerId, DomainError};

/// Customer Aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    full_name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl Customer {
    /// Register a new customer
    pub fn register(full_name: &str, email: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id: CustomerId::new(),
            full_name: valid_name(full_name)?,
            email: valid_email(email)?,
            created_at: Utc::now(),
        })
    }

    /// Replace the given profile fields. Nothing changes unless every
    /// supplied value is valid.
    pub fn update(&mut self, full_name: Option<&str>, email: Option<&str>) -> Result<(), DomainError> {
        let full_name = full_name.map(valid_name).transpose()?;
        let email = email.map(valid_email).transpose()?;

        if let Some(full_name) = full_name {
            self.full_name = full_name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        Ok(())
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn valid_name(full_name: &str) -> Result<String, DomainError> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(DomainError::Validation("Full name is required".to_string()));
    }
    Ok(full_name.to_string())
}

fn valid_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    if !is_plausible_email(email) {
        return Err(DomainError::Validation(format!(
            "Invalid e-mail address: {}",
            email
        )));
    }
    Ok(email.to_string())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
