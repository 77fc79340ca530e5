//! Receive-payment and pay-bills workflows.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::core::services::{ServiceError, ServiceResult};
use crate::currency::CurrencyCode;
use crate::domain::{round_money, Allocation, Company, Difference, Transaction, TransactionKind};
use crate::ledger::allocation::apply;
use crate::ledger::{plan_allocations, post, reconcile, AllocationError, LedgerWriter};

/// A payment as entered on the receive-payment or pay-bills screen.
///
/// `amount` is what moved through the bank; the allocations plus the optional
/// difference must add up to it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentRequest {
    #[serde(default)]
    pub contact_id: Option<Uuid>,
    pub date: NaiveDate,
    pub payment_account_id: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub difference: Option<Difference>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub exchange_rate: Option<f64>,
}

impl PaymentRequest {
    pub fn new(date: NaiveDate, payment_account_id: Uuid, amount: f64) -> Self {
        Self {
            contact_id: None,
            date,
            payment_account_id,
            amount,
            allocations: Vec::new(),
            difference: None,
            memo: None,
            currency: None,
            exchange_rate: None,
        }
    }

    pub fn with_contact(mut self, contact_id: Uuid) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn allocate(mut self, target_id: Uuid, amount: f64) -> Self {
        self.allocations.push(Allocation { target_id, amount });
        self
    }

    pub fn with_difference(mut self, account_id: Uuid, amount: f64) -> Self {
        self.difference = Some(Difference { account_id, amount });
        self
    }
}

pub struct PaymentService;

impl PaymentService {
    /// Records a customer payment against open invoices.
    pub fn receive_payment(company: &mut Company, request: PaymentRequest) -> ServiceResult<Uuid> {
        Self::record(company, TransactionKind::CustomerPayment, request)
    }

    /// Records a payment against one or more open bills.
    pub fn pay_bills(company: &mut Company, request: PaymentRequest) -> ServiceResult<Uuid> {
        Self::record(company, TransactionKind::BillPayment, request)
    }

    fn record(company: &mut Company, kind: TransactionKind, request: PaymentRequest) -> ServiceResult<Uuid> {
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(ServiceError::Invalid(format!(
                "Payment amount must be a non-negative number, got {}",
                request.amount
            )));
        }
        if request.allocations.is_empty() && request.difference.is_none() {
            return Err(AllocationError::Empty.into());
        }
        if let Some(contact_id) = request.contact_id {
            let contact = company
                .contact(contact_id)
                .ok_or_else(|| ServiceError::not_found("Contact", contact_id))?;
            let role_ok = match kind {
                TransactionKind::CustomerPayment => contact.is_customer(),
                _ => contact.is_vendor(),
            };
            if !role_ok {
                return Err(ServiceError::Invalid(format!(
                    "{} cannot be used on a {}",
                    contact.name, kind
                )));
            }
        }

        let currency = request
            .currency
            .clone()
            .or_else(|| {
                request
                    .allocations
                    .first()
                    .and_then(|a| company.transaction(a.target_id))
                    .map(|target| target.currency.clone())
            })
            .unwrap_or_else(|| company.base_currency.clone());
        let exchange_rate = match request.exchange_rate {
            Some(rate) => rate,
            None if currency == company.base_currency => 1.0,
            None => {
                company
                    .fx_rates
                    .lookup_rate(currency.as_str(), company.base_currency.as_str(), request.date)?
                    .rate
            }
        };

        let mut payment = Transaction::new(kind, request.date, currency)
            .with_payment_account(request.payment_account_id)
            .with_exchange_rate(exchange_rate);
        payment.contact_id = request.contact_id;
        payment.memo = request.memo.clone();
        payment.allocations = request.allocations.clone();
        payment.difference = request.difference.clone();

        let plan = plan_allocations(company, &payment)?;
        plan.write_to(&mut payment);
        let residual = reconcile(request.amount, plan.applied_total(), payment.difference_amount())?;
        if let Some(difference) = payment.difference.as_mut() {
            difference.amount = round_money(difference.amount + residual);
        }
        post(company, &payment)?;

        payment.number = Some(company.next_number(kind));
        let id = payment.id;
        company.transactions.push(payment);
        if let Err(err) = LedgerWriter::commit(company, id) {
            company.transactions.retain(|txn| txn.id != id);
            return Err(err.into());
        }
        if let Err(err) = apply(company, &plan) {
            LedgerWriter::reverse(company, id);
            company.transactions.retain(|txn| txn.id != id);
            return Err(err.into());
        }
        info!(
            payment = %id,
            %kind,
            amount = request.amount,
            applied = plan.applied_total(),
            targets = plan.lines.len(),
            "recorded payment"
        );
        Ok(id)
    }
}
