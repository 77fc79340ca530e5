use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::domain::common::*;
use crate::domain::ledger_entry::EntrySide;

/// A node in the chart of accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Foreign currency the account is denominated in; `None` means the base currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: None,
            name: name.into(),
            account_type,
            parent_id: None,
            currency: None,
            archived: false,
            notes: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<CurrencyCode>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Converts raw debit and credit totals into a balance signed by the normal side.
    pub fn signed_balance(&self, debit: f64, credit: f64) -> f64 {
        match self.account_type.normal_side() {
            EntrySide::Debit => round_money(debit - credit),
            EntrySide::Credit => round_money(credit - debit),
        }
    }
}

impl Identifiable for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Account {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Account {
    fn display_label(&self) -> String {
        match &self.code {
            Some(code) => format!("{} {} ({})", code, self.name, self.account_type),
            None => format!("{} ({})", self.name, self.account_type),
        }
    }
}

/// Detailed account classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountType {
    Bank,
    AccountsReceivable,
    OtherCurrentAsset,
    FixedAsset,
    AccountsPayable,
    CreditCard,
    OtherCurrentLiability,
    LongTermLiability,
    Equity,
    Income,
    OtherIncome,
    CostOfGoodsSold,
    Expense,
    OtherExpense,
}

/// The five top-level account classes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountClass {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    pub fn class(self) -> AccountClass {
        match self {
            AccountType::Bank
            | AccountType::AccountsReceivable
            | AccountType::OtherCurrentAsset
            | AccountType::FixedAsset => AccountClass::Asset,
            AccountType::AccountsPayable
            | AccountType::CreditCard
            | AccountType::OtherCurrentLiability
            | AccountType::LongTermLiability => AccountClass::Liability,
            AccountType::Equity => AccountClass::Equity,
            AccountType::Income | AccountType::OtherIncome => AccountClass::Income,
            AccountType::CostOfGoodsSold | AccountType::Expense | AccountType::OtherExpense => {
                AccountClass::Expense
            }
        }
    }

    /// Side on which the account's balance increases.
    pub fn normal_side(self) -> EntrySide {
        match self.class() {
            AccountClass::Asset | AccountClass::Expense => EntrySide::Debit,
            AccountClass::Liability | AccountClass::Equity | AccountClass::Income => {
                EntrySide::Credit
            }
        }
    }

    pub fn is_balance_sheet(self) -> bool {
        matches!(
            self.class(),
            AccountClass::Asset | AccountClass::Liability | AccountClass::Equity
        )
    }

    /// Accounts that may fund or receive money on cash-type transactions.
    pub fn is_payment_account(self) -> bool {
        matches!(
            self,
            AccountType::Bank
                | AccountType::CreditCard
                | AccountType::OtherCurrentAsset
                | AccountType::OtherCurrentLiability
        )
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Bank => "Bank",
            AccountType::AccountsReceivable => "Accounts Receivable",
            AccountType::OtherCurrentAsset => "Other Current Asset",
            AccountType::FixedAsset => "Fixed Asset",
            AccountType::AccountsPayable => "Accounts Payable",
            AccountType::CreditCard => "Credit Card",
            AccountType::OtherCurrentLiability => "Other Current Liability",
            AccountType::LongTermLiability => "Long Term Liability",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::OtherIncome => "Other Income",
            AccountType::CostOfGoodsSold => "Cost of Goods Sold",
            AccountType::Expense => "Expense",
            AccountType::OtherExpense => "Other Expense",
        };
        f.write_str(label)
    }
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountClass::Asset => "Assets",
            AccountClass::Liability => "Liabilities",
            AccountClass::Equity => "Equity",
            AccountClass::Income => "Income",
            AccountClass::Expense => "Expenses",
        };
        f.write_str(label)
    }
}
