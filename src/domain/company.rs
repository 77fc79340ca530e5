use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::{CurrencyCode, FxBook};

use super::{
    account::{Account, AccountType},
    contact::Contact,
    ledger_entry::LedgerEntry,
    recurring::RecurringTemplate,
    sales_tax::SalesTax,
    transaction::{Transaction, TransactionKind},
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Well-known account names seeded by [`Company::with_default_chart`].
pub const FX_GAIN_LOSS_ACCOUNT: &str = "FX Gain/Loss";
pub const RETAINED_EARNINGS_ACCOUNT: &str = "Retained Earnings";

/// The company book: chart of accounts, contacts, documents, and the posted ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub base_currency: CurrencyCode,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub sales_taxes: Vec<SalesTax>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub recurring: Vec<RecurringTemplate>,
    #[serde(default)]
    pub fx_rates: FxBook,
    #[serde(default)]
    pub sequences: BTreeMap<TransactionKind, u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Company::schema_version_default")]
    pub schema_version: u8,
}

impl Company {
    pub fn new(name: impl Into<String>, base_currency: impl Into<CurrencyCode>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_currency: base_currency.into(),
            accounts: Vec::new(),
            contacts: Vec::new(),
            sales_taxes: Vec::new(),
            transactions: Vec::new(),
            entries: Vec::new(),
            recurring: Vec::new(),
            fx_rates: FxBook::new(),
            sequences: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Creates a company seeded with a minimal chart of accounts.
    pub fn with_default_chart(name: impl Into<String>, base_currency: impl Into<CurrencyCode>) -> Self {
        let mut company = Self::new(name, base_currency);
        let seed = [
            ("1000", "Cash", AccountType::Bank),
            ("1100", "Accounts Receivable", AccountType::AccountsReceivable),
            ("2000", "Accounts Payable", AccountType::AccountsPayable),
            ("2100", "Sales Tax Payable", AccountType::OtherCurrentLiability),
            ("3000", "Owner's Equity", AccountType::Equity),
            ("3100", RETAINED_EARNINGS_ACCOUNT, AccountType::Equity),
            ("4000", "Sales", AccountType::Income),
            ("5000", "Cost of Goods Sold", AccountType::CostOfGoodsSold),
            ("6000", "General Expenses", AccountType::Expense),
            ("6100", "Bank Fees", AccountType::Expense),
            ("7000", FX_GAIN_LOSS_ACCOUNT, AccountType::OtherExpense),
        ];
        for (code, name, account_type) in seed {
            company.add_account(Account::new(name, account_type).with_code(code));
        }
        company
    }

    pub fn add_account(&mut self, account: Account) -> Uuid {
        let id = account.id;
        self.accounts.push(account);
        self.touch();
        id
    }

    pub fn add_contact(&mut self, contact: Contact) -> Uuid {
        let id = contact.id;
        self.contacts.push(contact);
        self.touch();
        id
    }

    pub fn add_sales_tax(&mut self, tax: SalesTax) -> Uuid {
        let id = tax.id;
        self.sales_taxes.push(tax);
        self.touch();
        id
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn account_mut(&mut self, id: Uuid) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.id == id)
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        let needle = name.trim();
        self.accounts
            .iter()
            .find(|account| account.name.eq_ignore_ascii_case(needle))
    }

    /// First active account of the given type, used for AR/AP control postings.
    pub fn system_account(&self, account_type: AccountType) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.account_type == account_type && !account.archived)
    }

    pub fn contact(&self, id: Uuid) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    pub fn contact_mut(&mut self, id: Uuid) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|contact| contact.id == id)
    }

    pub fn contact_by_name(&self, name: &str) -> Option<&Contact> {
        let needle = name.trim();
        self.contacts
            .iter()
            .find(|contact| contact.name.eq_ignore_ascii_case(needle))
    }

    pub fn sales_tax(&self, id: Uuid) -> Option<&SalesTax> {
        self.sales_taxes.iter().find(|tax| tax.id == id)
    }

    pub fn sales_tax_mut(&mut self, id: Uuid) -> Option<&mut SalesTax> {
        self.sales_taxes.iter_mut().find(|tax| tax.id == id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn transaction_mut(&mut self, id: Uuid) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|txn| txn.id == id)
    }

    pub fn recurring_template(&self, id: Uuid) -> Option<&RecurringTemplate> {
        self.recurring.iter().find(|template| template.id == id)
    }

    pub fn recurring_template_mut(&mut self, id: Uuid) -> Option<&mut RecurringTemplate> {
        self.recurring.iter_mut().find(|template| template.id == id)
    }

    pub fn entries_for_transaction(&self, id: Uuid) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |entry| entry.transaction_id == id)
    }

    /// Reserves the next document number for `kind`, e.g. `INV-0003`.
    pub fn next_number(&mut self, kind: TransactionKind) -> String {
        let counter = self.sequences.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{:04}", kind.number_prefix(), counter)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
