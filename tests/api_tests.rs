use bookkeeper_core::api::{ApiRequest, ApiResponse, Router};
use bookkeeper_core::config::Config;
use bookkeeper_core::domain::Company;
use serde_json::{json, Value};

struct Client {
    company: Company,
    config: Config,
}

impl Client {
    fn new() -> Self {
        Self {
            company: Company::with_default_chart("Api Integration", "USD"),
            config: Config::default(),
        }
    }

    fn send(&mut self, request: ApiRequest) -> ApiResponse {
        Router::handle(&mut self.company, &self.config, &request)
    }

    fn create(&mut self, path: &str, body: Value) -> String {
        let response = self.send(ApiRequest::post(path, body));
        assert_eq!(response.status, 201, "{} -> {}", path, response.body);
        response.body["id"].as_str().expect("id in response").to_string()
    }

    fn account(&self, name: &str) -> String {
        self.company.account_by_name(name).unwrap().id.to_string()
    }
}

#[test]
fn bill_lifecycle_through_the_api() {
    let mut client = Client::new();
    let vendor = client.create(
        "/api/contacts",
        json!({ "name": "Northwind", "kind": "Vendor", "payment_terms_days": 15 }),
    );
    let expenses = client.account("General Expenses");
    let bill = client.create(
        "/api/transactions",
        json!({
            "kind": "Bill",
            "date": "2024-02-01",
            "contact_id": vendor,
            "line_items": [ { "account_id": expenses, "unit_price": 240.0 } ]
        }),
    );
    let draft = client.send(ApiRequest::get(&format!("/api/transactions/{}", bill)));
    assert_eq!(draft.body["status"], "Draft");
    assert_eq!(draft.body["due_date"], "2024-02-16");
    assert!(client.company.entries.is_empty());

    let edited = client.send(ApiRequest::put(
        &format!("/api/transactions/{}", bill),
        json!({
            "kind": "Bill",
            "date": "2024-02-01",
            "contact_id": vendor,
            "line_items": [ { "account_id": expenses, "quantity": 2.0, "unit_price": 120.5 } ]
        }),
    ));
    assert_eq!(edited.status, 200, "{}", edited.body);
    assert_eq!(edited.body["amount"], 241.0);

    let posted = client.send(ApiRequest::post(&format!("/api/transactions/{}/post", bill), Value::Null));
    assert_eq!(posted.body["status"], "Posted");
    let again = client.send(ApiRequest::post(&format!("/api/transactions/{}/post", bill), Value::Null));
    assert_eq!(again.status, 400);

    let payment = client.send(ApiRequest::post(
        "/api/payments/pay-bills",
        json!({
            "contact_id": vendor,
            "date": "2024-02-10",
            "payment_account_id": client.account("Cash"),
            "amount": 241.0,
            "allocations": [ { "target_id": bill, "amount": 241.0 } ]
        }),
    ));
    assert_eq!(payment.status, 201, "{}", payment.body);
    assert_eq!(payment.body["number"], "BP-0001");

    let aging = client.send(ApiRequest::get("/api/reports/aging?side=payable&as_of=2024-03-31"));
    assert_eq!(aging.body["items"], json!([]));
    let register = client.send(ApiRequest::get(&format!(
        "/api/accounts/{}/register?from=2024-02-01&to=2024-02-28",
        client.account("Cash")
    )));
    assert_eq!(register.status, 200);
    assert_eq!(register.body["closing_balance"], -241.0);
}

#[test]
fn over_allocation_is_rejected() {
    let mut client = Client::new();
    let customer = client.create("/api/contacts", json!({ "name": "Contoso", "kind": "Customer" }));
    let invoice = client.send(ApiRequest::post(
        "/api/transactions?post=true",
        json!({
            "kind": "Invoice",
            "date": "2024-02-01",
            "contact_id": customer,
            "line_items": [ { "account_id": client.account("Sales"), "unit_price": 100.0 } ]
        }),
    ));
    let invoice_id = invoice.body["id"].as_str().unwrap().to_string();
    let response = client.send(ApiRequest::post(
        "/api/payments/receive",
        json!({
            "date": "2024-02-05",
            "payment_account_id": client.account("Cash"),
            "amount": 150.0,
            "allocations": [ { "target_id": invoice_id, "amount": 150.0 } ]
        }),
    ));
    assert_eq!(response.status, 400);
    assert!(response.body["message"].is_string());
    assert_eq!(client.company.transactions.len(), 1);
}

#[test]
fn recurring_templates_generate_on_run() {
    let mut client = Client::new();
    let customer = client.create("/api/contacts", json!({ "name": "Tenant", "kind": "Customer" }));
    let template = client.create(
        "/api/recurring",
        json!({
            "name": "Monthly rent",
            "start_date": "2024-01-01",
            "interval": { "every": 1, "unit": "Month" },
            "auto_post": true,
            "end": { "AfterOccurrences": 3 },
            "template": {
                "kind": "Invoice",
                "date": "2024-01-01",
                "contact_id": customer,
                "line_items": [ { "account_id": client.account("Sales"), "unit_price": 1200.0 } ]
            }
        }),
    );
    let run = client.send(ApiRequest::post("/api/recurring/run?as_of=2024-06-30", Value::Null));
    assert_eq!(run.status, 200);
    assert_eq!(run.body["generated"].as_array().unwrap().len(), 3);
    assert_eq!(run.body["completed"][0], template.as_str());

    let paused = client.send(ApiRequest::post(&format!("/api/recurring/{}/pause", template), Value::Null));
    assert_eq!(paused.status, 400);
    let listed = client.send(ApiRequest::get("/api/transactions?kind=Invoice&status=Posted"));
    assert_eq!(listed.body.as_array().unwrap().len(), 3);
    let removed = client.send(ApiRequest::delete(&format!("/api/recurring/{}", template)));
    assert_eq!(removed.status, 204);
}

#[test]
fn statements_render_as_pages() {
    let mut client = Client::new();
    let customer = client.create("/api/contacts", json!({ "name": "Statement Co", "kind": "Customer" }));
    for day in 1..=12 {
        let response = client.send(ApiRequest::post(
            "/api/transactions?post=true",
            json!({
                "kind": "Invoice",
                "date": format!("2024-03-{:02}", day),
                "contact_id": customer,
                "line_items": [ { "account_id": client.account("Sales"), "unit_price": 10.0 * day as f64 } ]
            }),
        ));
        assert_eq!(response.status, 201);
    }
    client.config.statement_lines_per_page = 8;
    let body = json!({ "contact_id": customer, "from": "2024-03-01", "to": "2024-03-31" });
    let statement = client.send(ApiRequest::post("/api/statements", body.clone()));
    assert_eq!(statement.status, 200);
    assert_eq!(statement.body["closing_balance"], 780.0);

    let pages = client.send(ApiRequest::post("/api/statements/pdf", body));
    let pages = pages.body["pages"].as_array().unwrap();
    assert!(pages.len() > 1);
    assert_eq!(pages[0]["total"], pages.len());
}
