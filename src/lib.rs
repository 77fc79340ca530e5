#![doc(test(attr(deny(warnings))))]

//! Bookkeeper Core is a double-entry small-business ledger: chart of accounts,
//! customers and vendors, invoices, bills and payments, sales tax, multi-currency
//! revaluation, recurring billing, statements and financial reports.
//!
//! [`crate::core::services`] validates every change before [`ledger`] writes entries,
//! [`api::Router`] exposes the services as JSON routes, and [`storage`] keeps one
//! JSON snapshot per company.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod currency;
pub mod domain;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Bookkeeper tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
