use tracing::info;
use uuid::Uuid;

use crate::domain::{Company, Contact, TransactionKind};

use super::{ServiceError, ServiceResult};

pub struct ContactService;

impl ContactService {
    pub fn add(company: &mut Company, mut contact: Contact) -> ServiceResult<Uuid> {
        contact.name = contact.name.trim().to_string();
        Self::validate(company, None, &contact)?;
        let id = company.add_contact(contact);
        info!(contact = %id, "added contact");
        Ok(id)
    }

    /// Replaces the editable fields; the kind may not drop a role that open items rely on.
    pub fn edit(company: &mut Company, id: Uuid, mut changes: Contact) -> ServiceResult<()> {
        changes.name = changes.name.trim().to_string();
        Self::validate(company, Some(id), &changes)?;
        if company.contact(id).is_none() {
            return Err(ServiceError::not_found("Contact", id));
        }
        let has_kind = |kind: TransactionKind| {
            company
                .transactions
                .iter()
                .any(|txn| txn.contact_id == Some(id) && txn.kind == kind)
        };
        if !changes.is_customer() && has_kind(TransactionKind::Invoice) {
            return Err(ServiceError::Invalid(
                "Contact has invoices and must remain a customer".into(),
            ));
        }
        if !changes.is_vendor() && has_kind(TransactionKind::Bill) {
            return Err(ServiceError::Invalid(
                "Contact has bills and must remain a vendor".into(),
            ));
        }

        let contact = company
            .contact_mut(id)
            .ok_or_else(|| ServiceError::not_found("Contact", id))?;
        contact.name = changes.name;
        contact.kind = changes.kind;
        contact.email = changes.email;
        contact.currency = changes.currency;
        contact.payment_terms_days = changes.payment_terms_days;
        contact.notes = changes.notes;
        company.touch();
        Ok(())
    }

    pub fn archive(company: &mut Company, id: Uuid, archived: bool) -> ServiceResult<()> {
        let contact = company
            .contact_mut(id)
            .ok_or_else(|| ServiceError::not_found("Contact", id))?;
        contact.archived = archived;
        company.touch();
        Ok(())
    }

    pub fn remove(company: &mut Company, id: Uuid) -> ServiceResult<()> {
        if company.contact(id).is_none() {
            return Err(ServiceError::not_found("Contact", id));
        }
        let referenced = company.transactions.iter().any(|txn| {
            txn.contact_id == Some(id) || txn.journal_lines.iter().any(|l| l.contact_id == Some(id))
        }) || company
            .recurring
            .iter()
            .any(|template| template.template.contact_id == Some(id));
        if referenced {
            return Err(ServiceError::Invalid(
                "Contact has transactions; archive it instead".into(),
            ));
        }
        company.contacts.retain(|contact| contact.id != id);
        company.touch();
        info!(contact = %id, "removed contact");
        Ok(())
    }

    pub fn list(company: &Company) -> Vec<&Contact> {
        let mut contacts: Vec<&Contact> = company.contacts.iter().collect();
        contacts.sort_by_key(|contact| contact.name.to_ascii_lowercase());
        contacts
    }

    fn validate(company: &Company, exclude: Option<Uuid>, contact: &Contact) -> ServiceResult<()> {
        if contact.name.is_empty() {
            return Err(ServiceError::Invalid("Contact name is required".into()));
        }
        if let Some(email) = contact.email.as_deref() {
            if !email.is_empty() && !email.contains('@') {
                return Err(ServiceError::Invalid(format!("`{}` is not an email address", email)));
            }
        }
        let normalized = contact.name.to_ascii_lowercase();
        let duplicate = company.contacts.iter().any(|existing| {
            existing.name.trim().to_ascii_lowercase() == normalized
                && exclude.map_or(true, |id| existing.id != id)
        });
        if duplicate {
            return Err(ServiceError::Invalid(format!(
                "Contact `{}` already exists",
                contact.name
            )));
        }
        Ok(())
    }
}
