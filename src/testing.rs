//! In-memory gateways and fixtures shared by the unit tests.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::billing::{
  BillingError, BillingGateway, BillingPayload, BillingRecord, EncodedPdf, EntityKind, Lookup,
};
use crate::domain::crm::properties::{company, invoice, line_item};
use crate::domain::crm::{CrmError, CrmGateway, CrmObject, ObjectType, Page, UploadedFile};
use crate::domain::invoice::{
  InvoiceError, InvoiceNumber, ProcessedInvoice, ProcessedInvoiceKey, ProcessedInvoiceRepository,
  TaxRates,
};

pub fn invoice_object(id: &str, number: &str, status: &str) -> CrmObject {
  CrmObject::new(id)
    .with_property(invoice::NUMBER, number)
    .with_property(invoice::STATUS, status)
    .with_property(invoice::INVOICE_DATE, "2026-10-01T00:00:00Z")
    .with_property(invoice::DUE_DATE, "2026-10-31T00:00:00Z")
}

pub fn company_object(id: &str, relation_number: Option<&str>) -> CrmObject {
  let object = CrmObject::new(id)
    .with_property(company::NAME, "Acme BV")
    .with_property(company::CITY, "Utrecht");
  match relation_number {
    Some(relation_number) => object.with_property(company::RELATION_NUMBER, relation_number),
    None => object,
  }
}

pub fn line_item_object(
  id: &str,
  sku: Option<&str>,
  quantity: &str,
  price: &str,
  discount: &str,
) -> CrmObject {
  let object = CrmObject::new(id)
    .with_property(line_item::NAME, format!("Line {}", id))
    .with_property(line_item::QUANTITY, quantity)
    .with_property(line_item::PRICE, price)
    .with_property(line_item::DISCOUNT, discount);
  match sku {
    Some(sku) => object.with_property(line_item::SKU, sku),
    None => object,
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmActivity {
  pub company_id: String,
  pub title: String,
  pub body: String,
}

/// CRM whose invoice pages are addressed by `page-N` cursors.
#[derive(Default)]
pub struct FakeCrm {
  pages: Vec<Vec<CrmObject>>,
  associations: HashMap<(String, ObjectType), Result<Vec<String>, Vec<String>>>,
  entities: HashMap<(ObjectType, String), CrmObject>,
  tax_rates: TaxRates,
  failing_listing: bool,
  failing_uploads: bool,
  list_calls: Mutex<Vec<Option<String>>>,
  uploads: Mutex<Vec<String>>,
  notes: Mutex<Vec<CrmActivity>>,
  tasks: Mutex<Vec<CrmActivity>>,
}

impl FakeCrm {
  pub fn new() -> Self {
    Self::default()
  }

  /// Puts the invoice on the given page and wires its associations.
  pub fn add_invoice(
    &mut self,
    page: usize,
    invoice: CrmObject,
    company: Option<CrmObject>,
    contact: Option<CrmObject>,
    line_items: Vec<CrmObject>,
  ) {
    if self.pages.len() <= page {
      self.pages.resize(page + 1, Vec::new());
    }

    let invoice_id = invoice.id.clone();
    for (object_type, objects) in [
      (ObjectType::Companies, company.into_iter().collect::<Vec<_>>()),
      (ObjectType::Contacts, contact.into_iter().collect()),
      (ObjectType::LineItems, line_items),
    ] {
      let ids = objects.iter().map(|object| object.id.clone()).collect();
      self
        .associations
        .insert((invoice_id.clone(), object_type), Ok(ids));
      for object in objects {
        self
          .entities
          .insert((object_type, object.id.clone()), object);
      }
    }

    self.pages[page].push(invoice);
  }

  pub fn fail_association(&mut self, invoice_id: &str, to: ObjectType, message: &str) {
    self
      .associations
      .insert((invoice_id.to_string(), to), Err(vec![message.to_string()]));
  }

  pub fn set_tax_rates(&mut self, tax_rates: TaxRates) {
    self.tax_rates = tax_rates;
  }

  pub fn fail_listing(&mut self) {
    self.failing_listing = true;
  }

  pub fn fail_uploads(&mut self) {
    self.failing_uploads = true;
  }

  pub fn list_calls(&self) -> Vec<Option<String>> {
    self.list_calls.lock().unwrap().clone()
  }

  pub fn uploads(&self) -> Vec<String> {
    self.uploads.lock().unwrap().clone()
  }

  pub fn notes(&self) -> Vec<CrmActivity> {
    self.notes.lock().unwrap().clone()
  }

  pub fn tasks(&self) -> Vec<CrmActivity> {
    self.tasks.lock().unwrap().clone()
  }
}

#[async_trait]
impl CrmGateway for FakeCrm {
  async fn list_invoices(&self, after: Option<&str>) -> Result<Page<CrmObject>, CrmError> {
    self.list_calls.lock().unwrap().push(after.map(str::to_string));
    if self.failing_listing {
      return Err(CrmError::Api {
        status: 500,
        body: "internal error".to_string(),
      });
    }

    let index = match after {
      Some(cursor) => cursor
        .strip_prefix("page-")
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(|| CrmError::InvalidResponse(format!("unknown cursor {}", cursor)))?,
      None => 0,
    };

    Ok(Page {
      results: self.pages.get(index).cloned().unwrap_or_default(),
      next_cursor: (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1)),
    })
  }

  async fn get_associated(
    &self,
    invoice_id: &str,
    to: ObjectType,
  ) -> Result<Vec<String>, CrmError> {
    match self.associations.get(&(invoice_id.to_string(), to)) {
      Some(Ok(ids)) => Ok(ids.clone()),
      Some(Err(messages)) => Err(CrmError::Association(messages.clone())),
      None => Ok(Vec::new()),
    }
  }

  async fn get_entity(
    &self,
    object_type: ObjectType,
    id: &str,
    _fields: &[&str],
  ) -> Result<CrmObject, CrmError> {
    self
      .entities
      .get(&(object_type, id.to_string()))
      .cloned()
      .ok_or_else(|| CrmError::Api {
        status: 404,
        body: format!("{} {} not found", object_type.as_str(), id),
      })
  }

  async fn upload_file(&self, name: &str, _bytes: Vec<u8>) -> Result<UploadedFile, CrmError> {
    if self.failing_uploads {
      return Err(CrmError::Transport("connection reset".to_string()));
    }
    let mut uploads = self.uploads.lock().unwrap();
    uploads.push(name.to_string());
    Ok(UploadedFile {
      id: format!("file-{}", uploads.len()),
      url: Some(format!("https://files.example.com/{}", name)),
    })
  }

  async fn create_note(&self, company_id: &str, body: &str, file_id: &str) -> Result<(), CrmError> {
    self.notes.lock().unwrap().push(CrmActivity {
      company_id: company_id.to_string(),
      title: file_id.to_string(),
      body: body.to_string(),
    });
    Ok(())
  }

  async fn create_task(&self, company_id: &str, title: &str, body: &str) -> Result<(), CrmError> {
    self.tasks.lock().unwrap().push(CrmActivity {
      company_id: company_id.to_string(),
      title: title.to_string(),
      body: body.to_string(),
    });
    Ok(())
  }

  async fn get_tax_rates(&self) -> Result<TaxRates, CrmError> {
    Ok(self.tax_rates.clone())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingCall {
  Show(EntityKind, String),
  Add(EntityKind, String),
  Edit(EntityKind, String),
  Download(String),
  MarkPaid(String),
}

/// Billing system backed by a map of records keyed by entity kind and code.
pub struct FakeBilling {
  records: Mutex<HashMap<(EntityKind, String), BillingRecord>>,
  calls: Mutex<Vec<BillingCall>>,
  payloads: Mutex<Vec<BillingPayload>>,
  failing_adds: Mutex<HashSet<EntityKind>>,
  failing_downloads: Mutex<bool>,
  encoded_pdf: Mutex<String>,
}

pub const PDF_BYTES: &[u8] = b"%PDF-1.4 test";

impl FakeBilling {
  pub fn new() -> Self {
    Self {
      records: Mutex::new(HashMap::new()),
      calls: Mutex::new(Vec::new()),
      payloads: Mutex::new(Vec::new()),
      failing_adds: Mutex::new(HashSet::new()),
      failing_downloads: Mutex::new(false),
      encoded_pdf: Mutex::new(STANDARD.encode(PDF_BYTES)),
    }
  }

  pub fn insert(&self, kind: EntityKind, code: &str, record: Value) {
    let record = match record {
      Value::Object(map) => BillingRecord(map),
      _ => BillingRecord::default(),
    };
    self
      .records
      .lock()
      .unwrap()
      .insert((kind, code.to_string()), record);
  }

  pub fn record(&self, kind: EntityKind, code: &str) -> Option<BillingRecord> {
    self
      .records
      .lock()
      .unwrap()
      .get(&(kind, code.to_string()))
      .cloned()
  }

  pub fn fail_adds(&self, kind: EntityKind) {
    self.failing_adds.lock().unwrap().insert(kind);
  }

  pub fn fail_downloads(&self) {
    *self.failing_downloads.lock().unwrap() = true;
  }

  pub fn set_encoded_pdf(&self, encoded: &str) {
    *self.encoded_pdf.lock().unwrap() = encoded.to_string();
  }

  pub fn calls(&self) -> Vec<BillingCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn payloads(&self) -> Vec<BillingPayload> {
    self.payloads.lock().unwrap().clone()
  }

  fn rejected(kind: EntityKind, action: &str, error: &str) -> BillingError {
    BillingError::Rejected {
      controller: kind.to_string(),
      action: action.to_string(),
      errors: vec![error.to_string()],
    }
  }

  fn store(&self, payload: &BillingPayload) -> BillingRecord {
    let record = match serde_json::to_value(payload) {
      Ok(Value::Object(map)) => BillingRecord(map),
      _ => BillingRecord::default(),
    };
    self
      .records
      .lock()
      .unwrap()
      .insert((payload.kind(), payload.code().to_string()), record.clone());
    self.payloads.lock().unwrap().push(payload.clone());
    record
  }
}

#[async_trait]
impl BillingGateway for FakeBilling {
  async fn show(&self, kind: EntityKind, code: &str) -> Result<Lookup<BillingRecord>, BillingError> {
    self
      .calls
      .lock()
      .unwrap()
      .push(BillingCall::Show(kind, code.to_string()));
    Ok(match self.record(kind, code) {
      Some(record) => Lookup::Found(record),
      None => Lookup::NotFound,
    })
  }

  async fn add(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError> {
    let kind = payload.kind();
    self
      .calls
      .lock()
      .unwrap()
      .push(BillingCall::Add(kind, payload.code().to_string()));
    if self.failing_adds.lock().unwrap().contains(&kind) {
      return Err(Self::rejected(kind, "add", "Invalid data"));
    }
    Ok(self.store(payload))
  }

  async fn edit(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError> {
    let kind = payload.kind();
    self
      .calls
      .lock()
      .unwrap()
      .push(BillingCall::Edit(kind, payload.code().to_string()));
    if self.record(kind, payload.code()).is_none() {
      return Err(Self::rejected(kind, "edit", "Unknown code"));
    }
    Ok(self.store(payload))
  }

  async fn download(&self, invoice_code: &str) -> Result<EncodedPdf, BillingError> {
    self
      .calls
      .lock()
      .unwrap()
      .push(BillingCall::Download(invoice_code.to_string()));
    if *self.failing_downloads.lock().unwrap()
      || self.record(EntityKind::Invoice, invoice_code).is_none()
    {
      return Err(Self::rejected(EntityKind::Invoice, "download", "Invoice not found"));
    }
    Ok(EncodedPdf(self.encoded_pdf.lock().unwrap().clone()))
  }

  async fn mark_as_paid(&self, invoice_code: &str) -> Result<BillingRecord, BillingError> {
    self
      .calls
      .lock()
      .unwrap()
      .push(BillingCall::MarkPaid(invoice_code.to_string()));
    let mut records = self.records.lock().unwrap();
    let record = records
      .get_mut(&(EntityKind::Invoice, invoice_code.to_string()))
      .ok_or_else(|| Self::rejected(EntityKind::Invoice, "markaspaid", "Invoice not found"))?;
    record.0.insert("Status".to_string(), Value::from(4));
    Ok(record.clone())
  }
}

/// Dedup store kept in memory; `unavailable()` fails every call.
#[derive(Default)]
pub struct InMemoryProcessedInvoices {
  records: Mutex<Vec<ProcessedInvoice>>,
  unavailable: bool,
}

impl InMemoryProcessedInvoices {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn unavailable() -> Self {
    Self {
      unavailable: true,
      ..Self::default()
    }
  }

  pub fn records(&self) -> Vec<ProcessedInvoice> {
    self.records.lock().unwrap().clone()
  }

  fn check(&self) -> Result<(), InvoiceError> {
    if self.unavailable {
      return Err(InvoiceError::Database(sqlx::Error::PoolClosed));
    }
    Ok(())
  }
}

#[async_trait]
impl ProcessedInvoiceRepository for InMemoryProcessedInvoices {
  async fn exists(&self, key: &ProcessedInvoiceKey) -> Result<bool, InvoiceError> {
    self.check()?;
    Ok(self.records.lock().unwrap().iter().any(|r| &r.key == key))
  }

  async fn record(&self, processed: ProcessedInvoice) -> Result<(), InvoiceError> {
    self.check()?;
    let mut records = self.records.lock().unwrap();
    if records.iter().any(|r| r.key == processed.key) {
      return Err(InvoiceError::AlreadyRecorded(processed.key));
    }
    records.push(processed);
    Ok(())
  }

  async fn find_billing_code(
    &self,
    number: &InvoiceNumber,
  ) -> Result<Option<String>, InvoiceError> {
    self.check()?;
    Ok(
      self
        .records
        .lock()
        .unwrap()
        .iter()
        .rev()
        .filter(|r| &r.key.number == number)
        .find_map(|r| r.billing_invoice_code.clone()),
    )
  }
}
