use uuid::Uuid;

use crate::domain::{AccountClass, Company, SalesTax};

use super::{ServiceError, ServiceResult};

pub struct SalesTaxService;

impl SalesTaxService {
    pub fn add(company: &mut Company, mut tax: SalesTax) -> ServiceResult<Uuid> {
        tax.name = tax.name.trim().to_string();
        Self::validate(company, None, &tax)?;
        Ok(company.add_sales_tax(tax))
    }

    /// Rate changes apply to documents created afterwards; posted lines keep their tax.
    pub fn edit(company: &mut Company, id: Uuid, mut changes: SalesTax) -> ServiceResult<()> {
        changes.name = changes.name.trim().to_string();
        Self::validate(company, Some(id), &changes)?;
        let tax = company
            .sales_tax_mut(id)
            .ok_or_else(|| ServiceError::not_found("Sales tax", id))?;
        tax.name = changes.name;
        tax.rate = changes.rate;
        tax.account_id = changes.account_id;
        tax.archived = changes.archived;
        company.touch();
        Ok(())
    }

    pub fn list(company: &Company) -> Vec<&SalesTax> {
        company.sales_taxes.iter().collect()
    }

    fn validate(company: &Company, exclude: Option<Uuid>, tax: &SalesTax) -> ServiceResult<()> {
        if tax.name.is_empty() {
            return Err(ServiceError::Invalid("Sales tax name is required".into()));
        }
        if !tax.rate.is_finite() || !(0.0..=100.0).contains(&tax.rate) {
            return Err(ServiceError::Invalid(format!(
                "Sales tax rate must be between 0 and 100, got {}",
                tax.rate
            )));
        }
        let account = company
            .account(tax.account_id)
            .ok_or_else(|| ServiceError::not_found("Account", tax.account_id))?;
        if account.account_type.class() != AccountClass::Liability {
            return Err(ServiceError::Invalid(format!(
                "Sales tax must be collected in a liability account, not {}",
                account.account_type
            )));
        }
        let normalized = tax.name.to_ascii_lowercase();
        if company.sales_taxes.iter().any(|existing| {
            existing.name.to_ascii_lowercase() == normalized
                && exclude.map_or(true, |id| existing.id != id)
        }) {
            return Err(ServiceError::Invalid(format!(
                "Sales tax `{}` already exists",
                tax.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_and_account_are_validated() {
        let mut company = Company::with_default_chart("Taxes", "USD");
        let payable = company.account_by_name("Sales Tax Payable").unwrap().id;
        let sales = company.account_by_name("Sales").unwrap().id;

        assert!(SalesTaxService::add(&mut company, SalesTax::new("Bad", 120.0, payable)).is_err());
        assert!(SalesTaxService::add(&mut company, SalesTax::new("Wrong", 5.0, sales)).is_err());
        let id = SalesTaxService::add(&mut company, SalesTax::new("GST", 5.0, payable)).unwrap();

        let mut changes = company.sales_tax(id).unwrap().clone();
        changes.rate = 7.5;
        SalesTaxService::edit(&mut company, id, changes).unwrap();
        assert_eq!(company.sales_tax(id).unwrap().rate, 7.5);
    }
}
