use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::Company;

use super::error::ApiError;
use super::handlers::{self as h, HandlerResult};
use super::request::{ApiRequest, ApiResponse, Method};

/// Dispatches API requests against one open company.
pub struct Router;

impl Router {
    pub fn handle(company: &mut Company, config: &Config, request: &ApiRequest) -> ApiResponse {
        match Self::dispatch(company, config, request) {
            Ok(response) => {
                debug!(method = %request.method, path = %request.path, status = response.status, "api request");
                response
            }
            Err(err) => {
                let response = err.into_response();
                if response.status >= 500 {
                    warn!(method = %request.method, path = %request.path, status = response.status, "api request failed");
                } else {
                    debug!(method = %request.method, path = %request.path, status = response.status, "api request rejected");
                }
                response
            }
        }
    }

    fn dispatch(company: &mut Company, config: &Config, request: &ApiRequest) -> HandlerResult {
        use Method::*;

        let segments: Vec<&str> = request
            .path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((&"api", rest)) = segments.split_first() else {
            return Err(not_found(request));
        };
        let method = request.method;

        match rest {
            ["accounts"] => match method {
                Get => h::list_accounts(company),
                Post => h::create_account(company, request),
                _ => Err(not_allowed(request)),
            },
            ["accounts", id] => {
                let id = parse_id(id, request)?;
                match method {
                    Get => h::get_account(company, id),
                    Put => h::update_account(company, id, request),
                    Delete => h::delete_account(company, id),
                    _ => Err(not_allowed(request)),
                }
            }
            ["accounts", id, "register"] => {
                let id = parse_id(id, request)?;
                only(Get, request)?;
                h::account_register(company, id, request)
            }

            ["contacts"] => match method {
                Get => h::list_contacts(company),
                Post => h::create_contact(company, config, request),
                _ => Err(not_allowed(request)),
            },
            ["contacts", id] => {
                let id = parse_id(id, request)?;
                match method {
                    Get => h::get_contact(company, id),
                    Put => h::update_contact(company, id, request),
                    Delete => h::delete_contact(company, id),
                    _ => Err(not_allowed(request)),
                }
            }
            ["contacts", id, "aging"] => {
                let id = parse_id(id, request)?;
                only(Get, request)?;
                h::contact_aging(company, id, request)
            }

            ["sales-taxes"] => match method {
                Get => h::list_sales_taxes(company),
                Post => h::create_sales_tax(company, request),
                _ => Err(not_allowed(request)),
            },
            ["sales-taxes", id] => {
                let id = parse_id(id, request)?;
                only(Put, request)?;
                h::update_sales_tax(company, id, request)
            }

            ["transactions"] => match method {
                Get => h::list_transactions(company, request),
                Post => h::create_transaction(company, request),
                _ => Err(not_allowed(request)),
            },
            ["transactions", id] => {
                let id = parse_id(id, request)?;
                match method {
                    Get => h::get_transaction(company, id),
                    Put => h::update_transaction(company, id, request),
                    Delete => h::delete_transaction(company, id),
                    _ => Err(not_allowed(request)),
                }
            }
            ["transactions", id, action @ ("post" | "void")] => {
                let id = parse_id(id, request)?;
                only(Post, request)?;
                if *action == "post" {
                    h::post_transaction(company, id)
                } else {
                    h::void_transaction(company, id)
                }
            }

            ["payments", "receive"] => {
                only(Post, request)?;
                h::receive_payment(company, request)
            }
            ["payments", "pay-bills"] => {
                only(Post, request)?;
                h::pay_bills(company, request)
            }

            ["recurring"] => match method {
                Get => h::list_recurring(company),
                Post => h::create_recurring(company, request),
                _ => Err(not_allowed(request)),
            },
            ["recurring", "run"] => {
                only(Post, request)?;
                h::run_recurring(company, request)
            }
            ["recurring", id] => {
                let id = parse_id(id, request)?;
                only(Delete, request)?;
                h::delete_recurring(company, id)
            }
            ["recurring", id, action @ ("pause" | "resume")] => {
                let id = parse_id(id, request)?;
                only(Post, request)?;
                if *action == "pause" {
                    h::pause_recurring(company, id)
                } else {
                    h::resume_recurring(company, id)
                }
            }

            ["statements"] => {
                only(Post, request)?;
                h::statement(company, request)
            }
            ["statements", "pdf"] => {
                only(Post, request)?;
                h::statement_pages(company, config, request)
            }

            ["reports", report] => {
                only(Get, request)?;
                match *report {
                    "trial-balance" => h::trial_balance(company, request),
                    "profit-and-loss" => h::profit_and_loss(company, request),
                    "balance-sheet" => h::balance_sheet(company, request),
                    "aging" => h::aging(company, request),
                    _ => Err(not_found(request)),
                }
            }

            ["fx", "rates"] => match method {
                Get => h::list_rates(company),
                Post => h::add_rate(company, request),
                Delete => h::remove_rate(company, request),
                _ => Err(not_allowed(request)),
            },
            ["fx", "revaluation"] => match method {
                Get => h::preview_revaluation(company, request),
                Post => h::post_revaluation(company, request),
                _ => Err(not_allowed(request)),
            },

            _ => Err(not_found(request)),
        }
    }
}

fn parse_id(raw: &str, request: &ApiRequest) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| not_found(request))
}

fn only(expected: Method, request: &ApiRequest) -> Result<(), ApiError> {
    if request.method == expected {
        Ok(())
    } else {
        Err(not_allowed(request))
    }
}

fn not_found(request: &ApiRequest) -> ApiError {
    ApiError::NotFound(format!("No route for {}", request.path))
}

fn not_allowed(request: &ApiRequest) -> ApiError {
    ApiError::MethodNotAllowed {
        method: request.method,
        path: request.path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (Company, Config) {
        (Company::with_default_chart("Api Co", "USD"), Config::default())
    }

    fn call(company: &mut Company, config: &Config, request: ApiRequest) -> ApiResponse {
        Router::handle(company, config, &request)
    }

    fn account(company: &Company, name: &str) -> String {
        company.account_by_name(name).unwrap().id.to_string()
    }

    #[test]
    fn unknown_routes_and_methods() {
        let (mut company, config) = setup();
        assert_eq!(call(&mut company, &config, ApiRequest::get("/api/widgets")).status, 404);
        assert_eq!(call(&mut company, &config, ApiRequest::get("/health")).status, 404);
        assert_eq!(
            call(&mut company, &config, ApiRequest::get("/api/transactions/not-an-id")).status,
            404
        );
        let response = call(&mut company, &config, ApiRequest::delete("/api/contacts"));
        assert_eq!(response.status, 405);
        assert!(response.body["message"].as_str().unwrap().contains("DELETE"));
    }

    #[test]
    fn unbalanced_journal_is_a_bad_request() {
        let (mut company, config) = setup();
        let cash = account(&company, "Cash");
        let sales = account(&company, "Sales");
        let body = json!({
            "kind": "JournalEntry",
            "date": "2024-05-01",
            "journal_lines": [
                { "account_id": cash, "debit": 100.0, "credit": 0.0 },
                { "account_id": sales, "debit": 0.0, "credit": 90.0 }
            ]
        });
        let response = call(&mut company, &config, ApiRequest::post("/api/transactions?post=true", body));
        assert_eq!(response.status, 400);
        assert!(response.body["message"].as_str().unwrap().to_lowercase().contains("unbalanced"));
        assert!(company.entries.is_empty());
        assert!(company.transactions.is_empty());
    }

    #[test]
    fn invoice_then_receive_payment() {
        let (mut company, config) = setup();
        let created = call(
            &mut company,
            &config,
            ApiRequest::post("/api/contacts", json!({ "name": "Acme", "kind": "Customer" })),
        );
        assert_eq!(created.status, 201);
        let customer = created.body["id"].as_str().unwrap().to_string();
        let contact = call(&mut company, &config, ApiRequest::get(&format!("/api/contacts/{}", customer)));
        assert_eq!(contact.body["payment_terms_days"], 30);

        let sales = account(&company, "Sales");
        let invoice = call(
            &mut company,
            &config,
            ApiRequest::post(
                "/api/transactions?post=true",
                json!({
                    "kind": "Invoice",
                    "date": "2024-05-01",
                    "contact_id": customer,
                    "line_items": [
                        { "account_id": sales, "quantity": 2.0, "unit_price": 50.0 }
                    ]
                }),
            ),
        );
        assert_eq!(invoice.status, 201, "{}", invoice.body);
        assert_eq!(invoice.body["status"], "Posted");
        assert_eq!(invoice.body["due_date"], "2024-05-31");
        let invoice_id = invoice.body["id"].as_str().unwrap().to_string();

        let cash = account(&company, "Cash");
        let payment = call(
            &mut company,
            &config,
            ApiRequest::post(
                "/api/payments/receive",
                json!({
                    "contact_id": customer,
                    "date": "2024-05-10",
                    "payment_account_id": cash,
                    "amount": 100.0,
                    "allocations": [ { "target_id": invoice_id, "amount": 100.0 } ]
                }),
            ),
        );
        assert_eq!(payment.status, 201, "{}", payment.body);

        let paid = call(&mut company, &config, ApiRequest::get("/api/transactions?kind=Invoice&status=Paid"));
        assert_eq!(paid.body.as_array().unwrap().len(), 1);
        let trial = call(&mut company, &config, ApiRequest::get("/api/reports/trial-balance"));
        assert_eq!(trial.status, 200);
        let aging = call(
            &mut company,
            &config,
            ApiRequest::get("/api/reports/aging?side=receivable&as_of=2024-07-01"),
        );
        assert_eq!(aging.body["items"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn missing_records_are_not_found() {
        let (mut company, config) = setup();
        let ghost = Uuid::new_v4();
        for request in [
            ApiRequest::get(&format!("/api/accounts/{}", ghost)),
            ApiRequest::post(&format!("/api/transactions/{}/void", ghost), json!(null)),
            ApiRequest::post(&format!("/api/recurring/{}/pause", ghost), json!(null)),
            ApiRequest::get(&format!("/api/contacts/{}/aging", ghost)),
        ] {
            assert_eq!(call(&mut company, &config, request).status, 404);
        }
    }

    #[test]
    fn fx_rates_and_revaluation_preview() {
        let (mut company, config) = setup();
        let rate = json!({ "from": "EUR", "to": "USD", "date": "2024-01-31", "rate": 1.1 });
        let created = call(&mut company, &config, ApiRequest::post("/api/fx/rates", rate));
        assert_eq!(created.status, 201);
        let listed = call(&mut company, &config, ApiRequest::get("/api/fx/rates"));
        assert_eq!(listed.body.as_array().unwrap().len(), 1);
        let preview = call(
            &mut company,
            &config,
            ApiRequest::get("/api/fx/revaluation?as_of=2024-01-31"),
        );
        assert_eq!(preview.status, 200);
        assert_eq!(preview.body["total_unrealized"], 0.0);
        let posted = call(
            &mut company,
            &config,
            ApiRequest::post("/api/fx/revaluation?as_of=2024-01-31", json!(null)),
        );
        assert_eq!(posted.status, 200);
        assert!(posted.body["journal_id"].is_null());
    }

    #[test]
    fn reads_leave_the_company_untouched() {
        let (mut company, mut config) = setup();
        company.fx_rates.tolerance_days = 2;
        config.fx_tolerance_days = 9;
        let stamp = company.updated_at;
        for path in ["/api/accounts", "/api/fx/rates", "/api/reports/trial-balance"] {
            assert_eq!(call(&mut company, &config, ApiRequest::get(path)).status, 200);
        }
        assert_eq!(company.updated_at, stamp);
        assert_eq!(company.fx_rates.tolerance_days, 2);
    }
}
