//! Applies customer payments to invoices and bill payments to bills.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    round_money, Company, Displayable, Transaction, TransactionStatus, ALLOCATION_TOLERANCE,
};

use super::error::AllocationError;

/// Guards float noise around the cent tolerance.
const EPSILON: f64 = 1e-9;

/// A validated allocation, with the amount clamped to the target's open balance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAllocation {
    pub target_id: Uuid,
    pub amount: f64,
    pub balance_before: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationPlan {
    pub lines: Vec<PlannedAllocation>,
}

impl AllocationPlan {
    pub fn applied_total(&self) -> f64 {
        round_money(self.lines.iter().map(|line| line.amount).sum())
    }

    /// Writes the clamped amounts back onto the payment's allocations.
    pub fn write_to(&self, payment: &mut Transaction) {
        for allocation in payment.allocations.iter_mut() {
            if let Some(line) = self
                .lines
                .iter()
                .find(|line| line.target_id == allocation.target_id)
            {
                allocation.amount = line.amount;
            }
        }
    }
}

/// Validates a payment's allocations against the open items they target.
pub fn plan_allocations(
    company: &Company,
    payment: &Transaction,
) -> Result<AllocationPlan, AllocationError> {
    let settles = payment.kind.settles().ok_or_else(|| AllocationError::WrongKind {
        target: String::new(),
        kind: "open item".into(),
        payment: payment.kind.to_string(),
    })?;
    let mut seen = HashSet::new();
    let mut plan = AllocationPlan::default();

    for allocation in &payment.allocations {
        if !allocation.amount.is_finite() || allocation.amount <= 0.0 {
            return Err(AllocationError::NonPositive(allocation.amount));
        }
        let target = company
            .transaction(allocation.target_id)
            .ok_or(AllocationError::TargetNotFound(allocation.target_id))?;
        let label = target.display_label();
        if !seen.insert(target.id) {
            return Err(AllocationError::Duplicate(label));
        }
        if target.kind != settles {
            return Err(AllocationError::WrongKind {
                target: label,
                kind: target.kind.to_string(),
                payment: payment.kind.to_string(),
            });
        }
        if !matches!(
            target.status,
            TransactionStatus::Posted | TransactionStatus::PartiallyPaid
        ) || target.balance <= 0.0
        {
            return Err(AllocationError::NotOpen(label));
        }
        if payment.contact_id.is_some() && target.contact_id != payment.contact_id {
            return Err(AllocationError::ContactMismatch(label));
        }
        if target.currency != payment.currency {
            return Err(AllocationError::CurrencyMismatch {
                target: label,
                target_currency: target.currency.to_string(),
                payment_currency: payment.currency.to_string(),
            });
        }
        if allocation.amount > target.balance + ALLOCATION_TOLERANCE + EPSILON {
            return Err(AllocationError::OverAllocated {
                target: label,
                amount: allocation.amount,
                balance: target.balance,
            });
        }
        plan.lines.push(PlannedAllocation {
            target_id: target.id,
            amount: round_money(allocation.amount.min(target.balance)),
            balance_before: target.balance,
        });
    }
    Ok(plan)
}

/// Checks that `applied + difference` matches `expected` within one cent.
///
/// Returns the signed residual `expected - applied - difference` (zero or one cent).
pub fn reconcile(expected: f64, applied: f64, difference: f64) -> Result<f64, AllocationError> {
    let residual = round_money(expected - applied - difference);
    if residual.abs() > ALLOCATION_TOLERANCE + EPSILON {
        return Err(AllocationError::Unreconciled {
            applied: round_money(applied),
            difference: round_money(difference),
            expected: round_money(expected),
        });
    }
    Ok(residual)
}

/// Reduces target balances by the planned amounts.
pub fn apply(company: &mut Company, plan: &AllocationPlan) -> Result<(), AllocationError> {
    for line in &plan.lines {
        if company.transaction(line.target_id).is_none() {
            return Err(AllocationError::TargetNotFound(line.target_id));
        }
    }
    for line in &plan.lines {
        if let Some(target) = company.transaction_mut(line.target_id) {
            target.balance = round_money((target.balance - line.amount).max(0.0));
            target.refresh_status();
            info!(
                target = %line.target_id,
                applied = line.amount,
                remaining = target.balance,
                "applied payment allocation"
            );
        }
    }
    company.touch();
    Ok(())
}

/// Restores the balances a payment had reduced, e.g. when it is voided or deleted.
pub fn release(company: &mut Company, payment: &Transaction) {
    for allocation in &payment.allocations {
        if let Some(target) = company.transaction_mut(allocation.target_id) {
            if target.status == TransactionStatus::Void {
                continue;
            }
            target.balance = round_money((target.balance + allocation.amount).min(target.amount));
            target.refresh_status();
            info!(
                target = %allocation.target_id,
                released = allocation.amount,
                remaining = target.balance,
                "released payment allocation"
            );
        }
    }
    company.touch();
}

/// Payments whose allocations currently reduce `target_id`.
pub fn payments_applied_to(company: &Company, target_id: Uuid) -> Vec<Uuid> {
    company
        .transactions
        .iter()
        .filter(|txn| txn.kind.is_payment() && txn.is_posted())
        .filter(|txn| txn.allocations.iter().any(|a| a.target_id == target_id))
        .map(|txn| txn.id)
        .collect()
}

/// Open balance of `txn` at the end of `as_of`: its amount less what posted
/// payments dated on or before that day applied to it.
pub fn balance_as_of(company: &Company, txn: &Transaction, as_of: NaiveDate) -> f64 {
    if !txn.is_open_item() || !txn.is_posted() || txn.date > as_of {
        return 0.0;
    }
    let applied: f64 = company
        .transactions
        .iter()
        .filter(|payment| payment.kind.is_payment() && payment.is_posted() && payment.date <= as_of)
        .flat_map(|payment| payment.allocations.iter())
        .filter(|allocation| allocation.target_id == txn.id)
        .map(|allocation| allocation.amount)
        .sum();
    round_money((txn.amount - applied).clamp(0.0, txn.amount.max(0.0)))
}
