//! Transport-agnostic REST dispatcher over the company book.
//!
//! A request names a method, a path such as `/api/transactions/{id}/post`, query
//! parameters, and a JSON body. The router turns it into service calls and answers
//! with a status code and a JSON body.

pub mod error;
mod handlers;
pub mod request;
pub mod router;

pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse, Method};
pub use router::Router;
