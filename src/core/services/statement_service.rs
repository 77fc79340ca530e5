use crate::config::Config;
use crate::domain::Company;
use crate::ledger::{generate_statement, render_statement, Statement, StatementPage, StatementRequest};

use super::ServiceResult;

pub struct StatementService;

impl StatementService {
    pub fn generate(company: &Company, request: &StatementRequest) -> ServiceResult<Statement> {
        Ok(generate_statement(company, request)?)
    }

    /// Generates the statement and lays it out as text pages sized by `config`.
    pub fn render(
        company: &Company,
        config: &Config,
        request: &StatementRequest,
    ) -> ServiceResult<Vec<StatementPage>> {
        let statement = generate_statement(company, request)?;
        Ok(render_statement(&statement, company, config))
    }
}
