use std::sync::Arc;

use crate::domain::crm::properties::{company, contact, line_item};
use crate::domain::crm::{CrmError, CrmGateway, ObjectType};
use crate::domain::invoice::{Company, Contact, Invoice, LineItemReconciler};

/// An invoice with its associated company, after line item reconciliation.
///
/// The contact only contributes the invoice annotation.
#[derive(Debug, Clone)]
pub struct InvoiceDetails {
  pub invoice: Invoice,
  pub company: Option<Company>,
  /// Association and line item problems that block billing.
  pub errors: Vec<String>,
}

/// Retrieves company, contact and line items for an invoice and validates them.
///
/// Company and line item association errors and invalid line items are
/// collected in [`InvoiceDetails::errors`]. A contact is optional, so its
/// association errors only leave the contact unset. Transport level failures
/// are returned as `Err`.
pub struct FetchInvoiceDetailsUseCase {
  crm: Arc<dyn CrmGateway>,
}

impl FetchInvoiceDetailsUseCase {
  pub fn new(crm: Arc<dyn CrmGateway>) -> Self {
    Self { crm }
  }

  pub async fn execute(
    &self,
    mut invoice: Invoice,
    reconciler: &LineItemReconciler,
  ) -> Result<InvoiceDetails, CrmError> {
    let mut errors = Vec::new();

    let company = match self.associated(&invoice, ObjectType::Companies, &mut errors).await? {
      Some(ids) => match ids.first() {
        Some(id) => {
          let object = self
            .crm
            .get_entity(ObjectType::Companies, id, company::ALL)
            .await?;
          let company = Company::from_crm(&object);
          tracing::info!(
            "company {}[{}] was retrieved",
            company.display_name(),
            company.id
          );
          Some(company)
        }
        None => {
          errors.push(format!("No company is associated with invoice {}", invoice.number));
          None
        }
      },
      None => None,
    };

    let contact = match self.associated_contacts(&invoice).await? {
      Some(ids) => match ids.first() {
        Some(id) => {
          let object = self
            .crm
            .get_entity(ObjectType::Contacts, id, contact::ALL)
            .await?;
          let contact = Contact::from_crm(&object);
          tracing::info!(
            "contact {}[{}] was retrieved",
            contact.last_name.as_deref().unwrap_or("-"),
            contact.id
          );
          Some(contact)
        }
        None => None,
      },
      None => None,
    };

    if let Some(ids) = self.associated(&invoice, ObjectType::LineItems, &mut errors).await? {
      let mut objects = Vec::with_capacity(ids.len());
      for id in &ids {
        objects.push(
          self
            .crm
            .get_entity(ObjectType::LineItems, id, line_item::ALL)
            .await?,
        );
      }

      let reconciliation = reconciler.reconcile_all(&objects);
      errors.extend(reconciliation.errors.iter().map(ToString::to_string));
      invoice.line_items = reconciliation.line_items;
    }

    invoice.annotation = contact
      .as_ref()
      .and_then(|contact| contact.invoice_annotation.clone());

    Ok(InvoiceDetails {
      invoice,
      company,
      errors,
    })
  }

  async fn associated_contacts(&self, invoice: &Invoice) -> Result<Option<Vec<String>>, CrmError> {
    match self.crm.get_associated(&invoice.id, ObjectType::Contacts).await {
      Ok(ids) => Ok(Some(ids)),
      Err(CrmError::Association(messages)) => {
        tracing::warn!(
          "No contact for invoice {}: {}",
          invoice.number,
          messages.join(" - ")
        );
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  /// Association ids, or `None` after recording the batch call's item-level errors.
  async fn associated(
    &self,
    invoice: &Invoice,
    to: ObjectType,
    errors: &mut Vec<String>,
  ) -> Result<Option<Vec<String>>, CrmError> {
    match self.crm.get_associated(&invoice.id, to).await {
      Ok(ids) => Ok(Some(ids)),
      Err(CrmError::Association(messages)) => {
        tracing::error!(
          "{} association lookup failed for invoice {}: {}",
          to.as_str(),
          invoice.number,
          messages.join(" - ")
        );
        errors.extend(messages);
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }
}
