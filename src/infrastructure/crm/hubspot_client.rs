use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::domain::crm::properties::invoice;
use crate::domain::crm::{CrmError, CrmGateway, CrmObject, ObjectType, Page, UploadedFile};
use crate::domain::invoice::{TaxRate, TaxRates};
use crate::infrastructure::config::{CrmConfig, HttpConfig};
use crate::infrastructure::http::RetryPolicy;

const NOTE_TO_COMPANY: u32 = 190;
const TASK_TO_COMPANY: u32 = 192;

/// HubSpot REST client behind [`CrmGateway`].
///
/// Reads (including the batch association read) are retried on transient
/// failures; object creation and file uploads are sent once.
pub struct HubSpotClient {
  client: Client,
  base_url: String,
  access_token: SecretString,
  page_size: u32,
  invoice_folder: String,
  retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ObjectPage {
  #[serde(default)]
  results: Vec<CrmObject>,
  paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
  next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
struct PagingNext {
  after: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociationBatch {
  #[serde(default)]
  results: Vec<AssociationResult>,
  #[serde(default)]
  num_errors: u32,
  #[serde(default)]
  errors: Vec<AssociationIssue>,
}

#[derive(Debug, Deserialize)]
struct AssociationResult {
  #[serde(default)]
  to: Vec<AssociatedObject>,
}

#[derive(Debug, Deserialize)]
struct AssociatedObject {
  #[serde(deserialize_with = "string_or_number")]
  id: String,
}

#[derive(Debug, Deserialize)]
struct AssociationIssue {
  message: String,
}

#[derive(Debug, Deserialize)]
struct TaxRatesResponse {
  results: Vec<TaxRateDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxRateDto {
  #[serde(deserialize_with = "string_or_number")]
  id: String,
  name: String,
  percentage_rate: Decimal,
  label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
  #[allow(dead_code)]
  id: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::String(value) => Ok(value),
    Value::Number(value) => Ok(value.to_string()),
    other => Err(de::Error::custom(format!("unexpected id {}", other))),
  }
}

impl HubSpotClient {
  pub fn new(config: &CrmConfig, http: &HttpConfig) -> Result<Self, CrmError> {
    let client = Client::builder()
      .timeout(http.timeout())
      .build()
      .map_err(|e| CrmError::Transport(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      access_token: config.access_token.clone(),
      page_size: config.page_size,
      invoice_folder: config.invoice_folder.clone(),
      retry: RetryPolicy::from_config(http),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn get(&self, path: &str) -> RequestBuilder {
    self
      .client
      .get(self.url(path))
      .bearer_auth(self.access_token.expose_secret())
  }

  fn post(&self, path: &str) -> RequestBuilder {
    self
      .client
      .post(self.url(path))
      .bearer_auth(self.access_token.expose_secret())
  }

  async fn send<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    idempotent: bool,
    operation: &str,
  ) -> Result<T, CrmError> {
    let response = self
      .retry
      .send(request, idempotent)
      .await
      .map_err(|e| CrmError::Transport(format!("{} failed: {}", operation, e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      tracing::error!("{} failed with status {}: {}", operation, status, body);
      return Err(CrmError::Api {
        status: status.as_u16(),
        body,
      });
    }

    response
      .json()
      .await
      .map_err(|e| CrmError::InvalidResponse(format!("{}: {}", operation, e)))
  }

  fn company_association(type_id: u32, company_id: &str) -> Value {
    json!([{
      "to": { "id": company_id },
      "types": [{
        "associationCategory": "HUBSPOT_DEFINED",
        "associationTypeId": type_id
      }]
    }])
  }
}

#[async_trait]
impl CrmGateway for HubSpotClient {
  async fn list_invoices(&self, after: Option<&str>) -> Result<Page<CrmObject>, CrmError> {
    let mut query = vec![
      ("limit", self.page_size.to_string()),
      ("properties", invoice::ALL.join(",")),
    ];
    if let Some(after) = after {
      query.push(("after", after.to_string()));
    }

    let page: ObjectPage = self
      .send(
        self.get("/crm/v3/objects/invoices").query(&query),
        true,
        "List invoices",
      )
      .await?;

    for object in &page.results {
      tracing::info!(
        "invoice {}[{}] was retrieved",
        object.property(invoice::NUMBER).unwrap_or("-"),
        object.id
      );
    }

    Ok(Page {
      results: page.results,
      next_cursor: page.paging.and_then(|paging| paging.next).map(|next| next.after),
    })
  }

  async fn get_associated(
    &self,
    invoice_id: &str,
    to: ObjectType,
  ) -> Result<Vec<String>, CrmError> {
    let path = format!("/crm/v3/associations/invoices/{}/batch/read", to.as_str());
    let body = json!({ "inputs": [{ "id": invoice_id }] });

    let batch: AssociationBatch = self
      .send(self.post(&path).json(&body), true, "Read associations")
      .await?;

    if batch.num_errors > 0 || !batch.errors.is_empty() {
      let mut messages: Vec<String> = batch.errors.into_iter().map(|e| e.message).collect();
      if messages.is_empty() {
        messages.push(format!(
          "{} association lookup reported {} error(s)",
          to.as_str(),
          batch.num_errors
        ));
      }
      return Err(CrmError::Association(messages));
    }

    Ok(
      batch
        .results
        .into_iter()
        .next()
        .map(|result| result.to.into_iter().map(|object| object.id).collect())
        .unwrap_or_default(),
    )
  }

  async fn get_entity(
    &self,
    object_type: ObjectType,
    id: &str,
    fields: &[&str],
  ) -> Result<CrmObject, CrmError> {
    let path = format!("/crm/v3/objects/{}/{}", object_type.as_str(), id);
    self
      .send(
        self.get(&path).query(&[("properties", fields.join(","))]),
        true,
        "Get object",
      )
      .await
  }

  async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<UploadedFile, CrmError> {
    let options = json!({ "access": "PUBLIC_INDEXABLE", "overwrite": true });
    let file = reqwest::multipart::Part::bytes(bytes)
      .file_name(name.to_string())
      .mime_str("application/pdf")
      .map_err(|e| CrmError::Transport(format!("MIME type error: {}", e)))?;
    let form = reqwest::multipart::Form::new()
      .part("file", file)
      .text("fileName", name.to_string())
      .text("folderPath", self.invoice_folder.clone())
      .text("options", options.to_string());

    let uploaded: UploadedFile = self
      .send(
        self.post("/files/v3/files").multipart(form),
        false,
        "Upload file",
      )
      .await?;

    tracing::info!("Uploaded {} (file ID: {})", name, uploaded.id);
    Ok(uploaded)
  }

  async fn create_note(&self, company_id: &str, body: &str, file_id: &str) -> Result<(), CrmError> {
    let note = json!({
      "properties": {
        "hs_note_body": body,
        "hs_attachment_ids": file_id,
        "hs_timestamp": Utc::now().timestamp_millis().to_string(),
      },
      "associations": Self::company_association(NOTE_TO_COMPANY, company_id),
    });

    let _: CreatedObject = self
      .send(self.post("/crm/v3/objects/notes").json(&note), false, "Create note")
      .await?;
    Ok(())
  }

  async fn create_task(&self, company_id: &str, title: &str, body: &str) -> Result<(), CrmError> {
    let due = Utc::now() + Duration::days(1);
    let task = json!({
      "properties": {
        "hs_task_subject": title,
        "hs_task_body": body,
        "hs_task_status": "WAITING",
        "hs_task_priority": "HIGH",
        "hs_timestamp": due.timestamp_millis().to_string(),
      },
      "associations": Self::company_association(TASK_TO_COMPANY, company_id),
    });

    let _: CreatedObject = self
      .send(self.post("/crm/v3/objects/tasks").json(&task), false, "Create task")
      .await?;
    tracing::info!("Task '{}' created on company {}", title, company_id);
    Ok(())
  }

  async fn get_tax_rates(&self) -> Result<TaxRates, CrmError> {
    let response: TaxRatesResponse = self
      .send(self.get("/tax-rates/v1/tax-rates"), true, "List tax rates")
      .await?;

    Ok(TaxRates::new(response.results.into_iter().map(|rate| {
      TaxRate {
        id: rate.id,
        name: rate.name,
        percentage: rate.percentage_rate,
        label: rate.label,
      }
    })))
  }
}
