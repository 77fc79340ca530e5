use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(ApiError::BadRequest(format!("unsupported method `{}`", other))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl ApiRequest {
    /// Builds a request, splitting any `?key=value&...` suffix of `target` into `query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let query = query_string
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.replace('+', " ")),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self {
            method,
            path: path.to_string(),
            query,
            body: Value::Null,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: &str, body: Value) -> Self {
        Self::new(Method::Post, target).with_body(body)
    }

    pub fn put(target: &str, body: Value) -> Self {
        Self::new(Method::Put, target).with_body(body)
    }

    pub fn delete(target: &str) -> Self {
        Self::new(Method::Delete, target)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn date_param(&self, name: &str) -> Result<Option<NaiveDate>, ApiError> {
        self.param(name)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ApiError::BadRequest(format!("`{}` must be a YYYY-MM-DD date, got `{}`", name, raw))
                })
            })
            .transpose()
    }

    pub fn required_date(&self, name: &str) -> Result<NaiveDate, ApiError> {
        self.date_param(name)?
            .ok_or_else(|| ApiError::BadRequest(format!("`{}` is required", name)))
    }

    pub fn uuid_param(&self, name: &str) -> Result<Option<Uuid>, ApiError> {
        self.param(name)
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ApiError::BadRequest(format!("`{}` must be an id, got `{}`", name, raw)))
            })
            .transpose()
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.param(name), Some("true" | "1" | "yes"))
    }

    /// Parses a query value through its serde representation, e.g. `kind=Invoice`.
    pub fn enum_param<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        self.param(name)
            .map(|raw| {
                serde_json::from_value(Value::String(raw.to_string()))
                    .map_err(|_| ApiError::BadRequest(format!("unknown {} `{}`", name, raw)))
            })
            .transpose()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_is_split_from_path() {
        let request = ApiRequest::get("/api/reports/aging?side=payable&as_of=2024-03-31&x");
        assert_eq!(request.path, "/api/reports/aging");
        assert_eq!(request.param("side"), Some("payable"));
        assert_eq!(
            request.date_param("as_of").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert_eq!(request.param("x"), None);
        assert!(request.date_param("missing").unwrap().is_none());
    }

    #[test]
    fn bad_parameters_are_bad_requests() {
        let request = ApiRequest::get("/api/transactions?from=31-03-2024&contact=abc");
        assert_eq!(request.date_param("from").unwrap_err().status(), 400);
        assert_eq!(request.uuid_param("contact").unwrap_err().status(), 400);
        assert_eq!("patch".parse::<Method>().unwrap_err().status(), 400);
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
    }
}
