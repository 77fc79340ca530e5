use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;

/// Debit or credit side of a posting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntrySide {
    Debit,
    Credit,
}

/// A single debit or credit line produced when a transaction posts.
///
/// `debit` and `credit` are always in the company's base currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    pub date: NaiveDate,
    pub debit: f64,
    pub credit: f64,
    pub currency: CurrencyCode,
    /// Signed (debit-positive) amount in `currency` when it differs from the base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LedgerEntry {
    pub fn net(&self) -> f64 {
        self.debit - self.credit
    }

    pub fn side(&self) -> EntrySide {
        if self.debit >= self.credit {
            EntrySide::Debit
        } else {
            EntrySide::Credit
        }
    }
}
