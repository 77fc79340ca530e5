//! One function per route; each turns a request into service calls.

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::core::services::{
    AccountService, ContactService, FxService, PaymentRequest, PaymentService, RecurringService,
    ReportService, SalesTaxService, StatementService, TransactionFilter, TransactionService,
};
use crate::currency::FxRate;
use crate::domain::{Account, Company, Contact, RecurringTemplate, SalesTax, Transaction};
use crate::ledger::{AgingSide, StatementRequest};

use super::error::ApiError;
use super::request::{ApiRequest, ApiResponse};

pub(crate) type HandlerResult = Result<ApiResponse, ApiError>;

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError::Internal(err.to_string()))
}

fn ok<T: Serialize>(value: &T) -> HandlerResult {
    Ok(ApiResponse::ok(to_json(value)?))
}

fn created(id: Uuid) -> HandlerResult {
    Ok(ApiResponse::created(json!({ "id": id })))
}

fn object(body: &Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(ApiError::BadRequest("Request body must be a JSON object".into())),
    }
}

/// Drops any client-sent `id` and fills a missing `currency` with the base currency.
fn new_transaction_body(company: &Company, body: &Value) -> Result<Value, ApiError> {
    let mut map = object(body)?;
    map.remove("id");
    map.entry("currency")
        .or_insert_with(|| Value::String(company.base_currency.to_string()));
    Ok(Value::Object(map))
}

fn new_record_body(body: &Value) -> Result<Value, ApiError> {
    let mut map = object(body)?;
    map.remove("id");
    Ok(Value::Object(map))
}

fn side(request: &ApiRequest) -> Result<AgingSide, ApiError> {
    request
        .param("side")
        .map(|raw| raw.parse::<AgingSide>().map_err(ApiError::BadRequest))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn as_of(request: &ApiRequest) -> Result<chrono::NaiveDate, ApiError> {
    Ok(request
        .date_param("as_of")?
        .unwrap_or_else(|| chrono::Local::now().date_naive()))
}

// accounts

pub(crate) fn list_accounts(company: &Company) -> HandlerResult {
    ok(&AccountService::list(company))
}

pub(crate) fn get_account(company: &Company, id: Uuid) -> HandlerResult {
    let account = company
        .account(id)
        .ok_or_else(|| ApiError::NotFound(format!("Account {} not found", id)))?;
    ok(account)
}

pub(crate) fn create_account(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let account: Account = serde_json::from_value(new_record_body(&request.body)?)?;
    created(AccountService::add(company, account)?)
}

pub(crate) fn update_account(company: &mut Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let changes: Account = serde_json::from_value(new_record_body(&request.body)?)?;
    AccountService::edit(company, id, changes)?;
    get_account(company, id)
}

pub(crate) fn delete_account(company: &mut Company, id: Uuid) -> HandlerResult {
    AccountService::remove(company, id)?;
    Ok(ApiResponse::no_content())
}

pub(crate) fn account_register(company: &Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let register = ReportService::register(
        company,
        id,
        request.date_param("from")?,
        request.date_param("to")?,
    )?;
    ok(&register)
}

// contacts

pub(crate) fn list_contacts(company: &Company) -> HandlerResult {
    ok(&ContactService::list(company))
}

pub(crate) fn get_contact(company: &Company, id: Uuid) -> HandlerResult {
    let contact = company
        .contact(id)
        .ok_or_else(|| ApiError::NotFound(format!("Contact {} not found", id)))?;
    ok(contact)
}

pub(crate) fn create_contact(company: &mut Company, config: &Config, request: &ApiRequest) -> HandlerResult {
    let mut map = object(&request.body)?;
    map.remove("id");
    map.entry("payment_terms_days")
        .or_insert_with(|| json!(config.default_payment_terms_days));
    let contact: Contact = serde_json::from_value(Value::Object(map))?;
    created(ContactService::add(company, contact)?)
}

pub(crate) fn update_contact(company: &mut Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let terms = company
        .contact(id)
        .map(|contact| contact.payment_terms_days)
        .ok_or_else(|| ApiError::NotFound(format!("Contact {} not found", id)))?;
    let mut map = object(&request.body)?;
    map.remove("id");
    map.entry("payment_terms_days").or_insert_with(|| json!(terms));
    let changes: Contact = serde_json::from_value(Value::Object(map))?;
    ContactService::edit(company, id, changes)?;
    get_contact(company, id)
}

pub(crate) fn delete_contact(company: &mut Company, id: Uuid) -> HandlerResult {
    ContactService::remove(company, id)?;
    Ok(ApiResponse::no_content())
}

pub(crate) fn contact_aging(company: &Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let schedule = ReportService::contact_aging(company, id, side(request)?, as_of(request)?)?;
    ok(&schedule)
}

// sales taxes

pub(crate) fn list_sales_taxes(company: &Company) -> HandlerResult {
    ok(&SalesTaxService::list(company))
}

pub(crate) fn create_sales_tax(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let tax: SalesTax = serde_json::from_value(new_record_body(&request.body)?)?;
    created(SalesTaxService::add(company, tax)?)
}

pub(crate) fn update_sales_tax(company: &mut Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let changes: SalesTax = serde_json::from_value(new_record_body(&request.body)?)?;
    SalesTaxService::edit(company, id, changes)?;
    let tax = company
        .sales_tax(id)
        .ok_or_else(|| ApiError::NotFound(format!("Sales tax {} not found", id)))?;
    ok(tax)
}

// transactions

pub(crate) fn list_transactions(company: &Company, request: &ApiRequest) -> HandlerResult {
    let filter = TransactionFilter {
        kind: request.enum_param("kind")?,
        status: request.enum_param("status")?,
        contact_id: request.uuid_param("contact")?,
        from: request.date_param("from")?,
        to: request.date_param("to")?,
    };
    ok(&TransactionService::list(company, &filter))
}

pub(crate) fn get_transaction(company: &Company, id: Uuid) -> HandlerResult {
    ok(TransactionService::get(company, id)?)
}

pub(crate) fn create_transaction(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let draft: Transaction = serde_json::from_value(new_transaction_body(company, &request.body)?)?;
    let id = TransactionService::create(company, draft, request.flag("post"))?;
    Ok(ApiResponse::created(to_json(TransactionService::get(company, id)?)?))
}

pub(crate) fn update_transaction(company: &mut Company, id: Uuid, request: &ApiRequest) -> HandlerResult {
    let changes: Transaction = serde_json::from_value(new_transaction_body(company, &request.body)?)?;
    TransactionService::update(company, id, changes)?;
    get_transaction(company, id)
}

pub(crate) fn delete_transaction(company: &mut Company, id: Uuid) -> HandlerResult {
    TransactionService::delete(company, id)?;
    Ok(ApiResponse::no_content())
}

pub(crate) fn post_transaction(company: &mut Company, id: Uuid) -> HandlerResult {
    TransactionService::post(company, id)?;
    get_transaction(company, id)
}

pub(crate) fn void_transaction(company: &mut Company, id: Uuid) -> HandlerResult {
    TransactionService::void(company, id)?;
    get_transaction(company, id)
}

// payments

pub(crate) fn receive_payment(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let payment: PaymentRequest = request.json()?;
    let id = PaymentService::receive_payment(company, payment)?;
    Ok(ApiResponse::created(to_json(TransactionService::get(company, id)?)?))
}

pub(crate) fn pay_bills(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let payment: PaymentRequest = request.json()?;
    let id = PaymentService::pay_bills(company, payment)?;
    Ok(ApiResponse::created(to_json(TransactionService::get(company, id)?)?))
}

// recurring

pub(crate) fn list_recurring(company: &Company) -> HandlerResult {
    ok(&RecurringService::list(company))
}

pub(crate) fn create_recurring(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let mut map = object(&request.body)?;
    map.remove("id");
    if let Some(template) = map.remove("template") {
        map.insert("template".into(), new_transaction_body(company, &template)?);
    }
    let template: RecurringTemplate = serde_json::from_value(Value::Object(map))?;
    created(RecurringService::add(company, template)?)
}

pub(crate) fn delete_recurring(company: &mut Company, id: Uuid) -> HandlerResult {
    RecurringService::remove(company, id)?;
    Ok(ApiResponse::no_content())
}

pub(crate) fn pause_recurring(company: &mut Company, id: Uuid) -> HandlerResult {
    RecurringService::pause(company, id)?;
    recurring_template(company, id)
}

pub(crate) fn resume_recurring(company: &mut Company, id: Uuid) -> HandlerResult {
    RecurringService::resume(company, id)?;
    recurring_template(company, id)
}

fn recurring_template(company: &Company, id: Uuid) -> HandlerResult {
    let template = company
        .recurring_template(id)
        .ok_or_else(|| ApiError::NotFound(format!("Recurring template {} not found", id)))?;
    ok(template)
}

pub(crate) fn run_recurring(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let summary = RecurringService::run_due(company, as_of(request)?);
    ok(&summary)
}

// statements

pub(crate) fn statement(company: &Company, request: &ApiRequest) -> HandlerResult {
    let statement_request: StatementRequest = request.json()?;
    ok(&StatementService::generate(company, &statement_request)?)
}

pub(crate) fn statement_pages(company: &Company, config: &Config, request: &ApiRequest) -> HandlerResult {
    let statement_request: StatementRequest = request.json()?;
    let pages = StatementService::render(company, config, &statement_request)?;
    Ok(ApiResponse::ok(json!({ "pages": to_json(&pages)? })))
}

// reports

pub(crate) fn trial_balance(company: &Company, request: &ApiRequest) -> HandlerResult {
    ok(&ReportService::trial_balance(company, request.date_param("as_of")?))
}

pub(crate) fn profit_and_loss(company: &Company, request: &ApiRequest) -> HandlerResult {
    let report = ReportService::profit_and_loss(
        company,
        request.required_date("from")?,
        request.required_date("to")?,
    )?;
    ok(&report)
}

pub(crate) fn balance_sheet(company: &Company, request: &ApiRequest) -> HandlerResult {
    ok(&ReportService::balance_sheet(company, as_of(request)?))
}

pub(crate) fn aging(company: &Company, request: &ApiRequest) -> HandlerResult {
    ok(&ReportService::aging(company, side(request)?, as_of(request)?))
}

// fx

pub(crate) fn list_rates(company: &Company) -> HandlerResult {
    ok(&FxService::list(company))
}

pub(crate) fn add_rate(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let rate: FxRate = request.json()?;
    FxService::add_rate(company, rate.clone())?;
    Ok(ApiResponse::created(to_json(&rate)?))
}

pub(crate) fn remove_rate(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let from = request
        .param("from")
        .ok_or_else(|| ApiError::BadRequest("`from` is required".into()))?;
    let to = request
        .param("to")
        .ok_or_else(|| ApiError::BadRequest("`to` is required".into()))?;
    let date = request.required_date("date")?;
    let removed = FxService::remove_rate(company, from, to, date)?;
    Ok(ApiResponse::ok(json!({ "removed": removed })))
}

pub(crate) fn preview_revaluation(company: &Company, request: &ApiRequest) -> HandlerResult {
    ok(&FxService::revalue(company, as_of(request)?)?)
}

pub(crate) fn post_revaluation(company: &mut Company, request: &ApiRequest) -> HandlerResult {
    let date = as_of(request)?;
    let report = FxService::revalue(company, date)?;
    let journal = FxService::post_revaluation(company, date)?;
    let status = if journal.is_some() { 201 } else { 200 };
    Ok(ApiResponse {
        status,
        body: json!({ "journal_id": journal, "report": to_json(&report)? }),
    })
}
