//! Command definitions
//!
//! Commands that create, reconfigure or remove customers and instruments.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountNumber, AccountType, CustomerId, InstrumentRef};

/// Command to register a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerCommand {
    pub full_name: String,
    pub email: String,
}

impl CreateCustomerCommand {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
        }
    }
}

/// Command to edit a customer's profile. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCustomerCommand {
    pub customer_id: CustomerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UpdateCustomerCommand {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            ..Self::default()
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Command to open an account for an existing customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    /// Initial PIN
    pub pin: String,
}

impl OpenAccountCommand {
    pub fn new(customer_id: CustomerId, account_type: AccountType, pin: impl Into<String>) -> Self {
        Self {
            customer_id,
            account_type,
            pin: pin.into(),
        }
    }
}

/// Command to issue a card on an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCardCommand {
    pub account: AccountNumber,
    pub holder_name: String,
    /// PIN of the new card
    pub pin: String,
    /// Credit line (as string for precise decimal); credit cards only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_limit: Option<String>,
}

impl IssueCardCommand {
    pub fn new(account: AccountNumber, holder_name: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            account,
            holder_name: holder_name.into(),
            pin: pin.into(),
            card_limit: None,
        }
    }

    pub fn with_card_limit(mut self, card_limit: impl Into<String>) -> Self {
        self.card_limit = Some(card_limit.into());
        self
    }
}

/// Command to block or unblock an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBlockedCommand {
    pub instrument: InstrumentRef,
    pub pin: String,
    pub blocked: bool,
}

impl SetBlockedCommand {
    pub fn new(instrument: InstrumentRef, pin: impl Into<String>, blocked: bool) -> Self {
        Self {
            instrument,
            pin: pin.into(),
            blocked,
        }
    }
}

/// Command to replace an instrument's PIN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePinCommand {
    pub instrument: InstrumentRef,
    pub old_pin: String,
    pub new_pin: String,
}

impl ChangePinCommand {
    pub fn new(
        instrument: InstrumentRef,
        old_pin: impl Into<String>,
        new_pin: impl Into<String>,
    ) -> Self {
        Self {
            instrument,
            old_pin: old_pin.into(),
            new_pin: new_pin.into(),
        }
    }
}
