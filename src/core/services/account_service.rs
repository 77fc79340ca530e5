use tracing::info;
use uuid::Uuid;

use crate::domain::{Account, Company};

use super::{ServiceError, ServiceResult};

pub struct AccountService;

impl AccountService {
    pub fn add(company: &mut Company, mut account: Account) -> ServiceResult<Uuid> {
        account.name = account.name.trim().to_string();
        Self::validate_name(company, None, &account.name)?;
        Self::validate_code(company, None, account.code.as_deref())?;
        if let Some(parent_id) = account.parent_id {
            Self::ensure_parent(company, account.id, parent_id)?;
        }
        let id = company.add_account(account);
        info!(account = %id, "added account");
        Ok(id)
    }

    /// Applies `changes` to the account; type and currency are frozen once entries exist.
    pub fn edit(company: &mut Company, id: Uuid, changes: Account) -> ServiceResult<()> {
        let name = changes.name.trim().to_string();
        Self::validate_name(company, Some(id), &name)?;
        Self::validate_code(company, Some(id), changes.code.as_deref())?;
        if let Some(parent_id) = changes.parent_id {
            Self::ensure_parent(company, id, parent_id)?;
        }
        let has_entries = company.entries.iter().any(|entry| entry.account_id == id);
        let account = company
            .account(id)
            .ok_or_else(|| ServiceError::not_found("Account", id))?;
        if has_entries
            && (account.account_type != changes.account_type || account.currency != changes.currency)
        {
            return Err(ServiceError::Invalid(
                "Account type and currency cannot change once entries are posted".into(),
            ));
        }

        let account = company
            .account_mut(id)
            .ok_or_else(|| ServiceError::not_found("Account", id))?;
        account.name = name;
        account.code = changes.code;
        account.account_type = changes.account_type;
        account.parent_id = changes.parent_id;
        account.currency = changes.currency;
        account.notes = changes.notes;
        company.touch();
        Ok(())
    }

    pub fn archive(company: &mut Company, id: Uuid, archived: bool) -> ServiceResult<()> {
        let account = company
            .account_mut(id)
            .ok_or_else(|| ServiceError::not_found("Account", id))?;
        account.archived = archived;
        company.touch();
        Ok(())
    }

    pub fn remove(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        if company.account(id).is_none() {
            return Err(ServiceError::not_found("Account", id));
        }
        if company.entries.iter().any(|entry| entry.account_id == id) {
            return Err(ServiceError::Invalid(
                "Account has posted entries; archive it instead".into(),
            ));
        }
        let referenced = company.transactions.iter().any(|txn| {
            txn.payment_account_id == Some(id)
                || txn.line_items.iter().any(|line| line.account_id == id)
                || txn.journal_lines.iter().any(|line| line.account_id == id)
                || txn.difference.as_ref().is_some_and(|d| d.account_id == id)
        });
        if referenced {
            return Err(ServiceError::Invalid(
                "Account is used by existing transactions".into(),
            ));
        }
        if company.sales_taxes.iter().any(|tax| tax.account_id == id) {
            return Err(ServiceError::Invalid(
                "Account collects a sales tax".into(),
            ));
        }
        if company.accounts.iter().any(|a| a.parent_id == Some(id)) {
            return Err(ServiceError::Invalid("Account has sub-accounts".into()));
        }
        company.accounts.retain(|account| account.id != id);
        company.touch();
        info!(account = %id, "removed account");
        Ok(())
    }

    pub fn list(company: &Company) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = company.accounts.iter().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(&b.name)));
        accounts
    }

    fn validate_name(company: &Company, exclude: Option<Uuid>, candidate: &str) -> ServiceResult<()> {
        if candidate.is_empty() {
            return Err(ServiceError::Invalid("Account name is required".into()));
        }
        let normalized = candidate.to_ascii_lowercase();
        let duplicate = company.accounts.iter().any(|account| {
            account.name.trim().to_ascii_lowercase() == normalized
                && exclude.map_or(true, |id| account.id != id)
        });
        if duplicate {
            Err(ServiceError::Invalid(format!(
                "Account `{}` already exists",
                candidate
            )))
        } else {
            Ok(())
        }
    }

    fn validate_code(company: &Company, exclude: Option<Uuid>, code: Option<&str>) -> ServiceResult<()> {
        let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) else {
            return Ok(());
        };
        let duplicate = company.accounts.iter().any(|account| {
            account.code.as_deref() == Some(code) && exclude.map_or(true, |id| account.id != id)
        });
        if duplicate {
            return Err(ServiceError::Invalid(format!(
                "Account code `{}` is already in use",
                code
            )));
        }
        Ok(())
    }

    /// The parent must exist and must not be the account itself or one of its descendants.
    fn ensure_parent(company: &Company, id: Uuid, parent_id: Uuid) -> ServiceResult<()> {
        let mut cursor = Some(parent_id);
        let mut depth = 0;
        while let Some(current) = cursor {
            if current == id {
                return Err(ServiceError::Invalid(
                    "Account cannot be nested under itself".into(),
                ));
            }
            let parent = company
                .account(current)
                .ok_or_else(|| ServiceError::Invalid("Parent account does not exist".into()))?;
            cursor = parent.parent_id;
            depth += 1;
            if depth > company.accounts.len() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountType, JournalLine, Transaction, TransactionKind};
    use crate::ledger::LedgerWriter;
    use chrono::NaiveDate;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut company = Company::with_default_chart("Accounts", "USD");
        let err = AccountService::add(&mut company, Account::new(" cash ", AccountType::Bank))
            .expect_err("duplicate must fail");
        assert!(matches!(err, ServiceError::Invalid(ref m) if m.contains("already exists")));
    }

    #[test]
    fn parent_must_exist_and_not_cycle() {
        let mut company = Company::new("Accounts", "USD");
        let err = AccountService::add(
            &mut company,
            Account::new("Petty Cash", AccountType::Bank).with_parent(Uuid::new_v4()),
        )
        .expect_err("missing parent");
        assert!(matches!(err, ServiceError::Invalid(_)));

        let parent = AccountService::add(&mut company, Account::new("Banks", AccountType::Bank)).unwrap();
        let child = AccountService::add(
            &mut company,
            Account::new("Checking", AccountType::Bank).with_parent(parent),
        )
        .unwrap();
        let mut changes = company.account(parent).unwrap().clone();
        changes.parent_id = Some(child);
        assert!(AccountService::edit(&mut company, parent, changes).is_err());
    }

    #[test]
    fn accounts_with_entries_cannot_be_removed() {
        let mut company = Company::with_default_chart("Accounts", "USD");
        let cash = company.account_by_name("Cash").unwrap().id;
        let equity = company.account_by_name("Owner's Equity").unwrap().id;
        let txn = Transaction::new(
            TransactionKind::JournalEntry,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "USD",
        )
        .with_journal_line(JournalLine::debit(cash, 10.0))
        .with_journal_line(JournalLine::credit(equity, 10.0));
        let id = txn.id;
        company.transactions.push(txn);
        LedgerWriter::commit(&mut company, id).unwrap();

        assert!(AccountService::remove(&mut company, cash).is_err());
        let fees = company.account_by_name("Bank Fees").unwrap().id;
        AccountService::remove(&mut company, fees).unwrap();
        assert!(company.account(fees).is_none());
        assert!(matches!(
            AccountService::remove(&mut company, fees),
            Err(ServiceError::NotFound(_))
        ));
    }
}
