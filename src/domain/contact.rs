use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::domain::common::*;

/// A customer or vendor the company trades with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub kind: ContactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    /// Days between a document date and its due date.
    #[serde(default)]
    pub payment_terms_days: u32,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, kind: ContactKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            email: None,
            currency: None,
            payment_terms_days: 30,
            archived: false,
            notes: None,
        }
    }

    pub fn customer(name: impl Into<String>) -> Self {
        Self::new(name, ContactKind::Customer)
    }

    pub fn vendor(name: impl Into<String>) -> Self {
        Self::new(name, ContactKind::Vendor)
    }

    pub fn with_terms(mut self, days: u32) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn is_customer(&self) -> bool {
        matches!(self.kind, ContactKind::Customer | ContactKind::Both)
    }

    pub fn is_vendor(&self) -> bool {
        matches!(self.kind, ContactKind::Vendor | ContactKind::Both)
    }
}

impl Identifiable for Contact {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Contact {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContactKind {
    Customer,
    Vendor,
    Both,
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContactKind::Customer => "Customer",
            ContactKind::Vendor => "Vendor",
            ContactKind::Both => "Customer & Vendor",
        };
        f.write_str(label)
    }
}
