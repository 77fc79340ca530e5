#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use bookkeeper_core::{
    config::ConfigManager,
    core::CompanyManager,
    domain::{Company, Contact},
    storage::JsonStorage,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Creates isolated managers backed by a unique directory for each test.
pub fn setup_test_env() -> (CompanyManager, ConfigManager, PathBuf) {
    let base = temp_base();
    let storage = JsonStorage::new(Some(base.clone()), Some(3)).expect("create json storage backend");
    let manager = CompanyManager::new(Box::new(storage));
    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    (manager, config_manager, base)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn account(company: &Company, name: &str) -> Uuid {
    company
        .account_by_name(name)
        .unwrap_or_else(|| panic!("account `{}` in default chart", name))
        .id
}

/// A USD company with one customer and one vendor on 30-day terms.
pub struct Fixture {
    pub company: Company,
    pub customer: Uuid,
    pub vendor: Uuid,
}

pub fn fixture() -> Fixture {
    let mut company = Company::with_default_chart("Fixture Trading", "USD");
    let customer = company.add_contact(Contact::customer("Acme Retail").with_terms(30));
    let vendor = company.add_contact(Contact::vendor("Paper Supply Co").with_terms(30));
    Fixture {
        company,
        customer,
        vendor,
    }
}
