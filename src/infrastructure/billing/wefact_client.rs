use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::domain::billing::{
  BillingError, BillingGateway, BillingPayload, BillingRecord, EncodedPdf, EntityKind, Lookup,
};
use crate::infrastructure::config::{BillingConfig, HttpConfig};
use crate::infrastructure::http::RetryPolicy;

/// WeFact API v2 client behind [`BillingGateway`].
///
/// Every call is a POST of `{api_key, controller, action, ..data}` to the
/// single API endpoint. Only `show` and `download` are retried.
pub struct WeFactClient {
  client: Client,
  url: String,
  api_key: SecretString,
  retry: RetryPolicy,
}

const ACCESS_ERROR_MARKERS: &[&str] = &[
  "api key",
  "api-key",
  "api_key",
  "apikey",
  "api-sleutel",
  "ip-adres",
  "ip address",
  "toegang",
  "access denied",
  "unauthorized",
  "not authorized",
];

#[derive(Debug, Deserialize)]
struct WeFactResponse {
  status: String,
  #[serde(default)]
  errors: Vec<String>,
  #[serde(flatten)]
  data: Map<String, Value>,
}

impl WeFactResponse {
  fn is_success(&self) -> bool {
    self.status == "success"
  }

  /// Errors about the API key or the caller's IP address rather than the requested record.
  fn is_access_denied(&self) -> bool {
    self.errors.iter().any(|error| {
      let error = error.to_lowercase();
      ACCESS_ERROR_MARKERS
        .iter()
        .any(|marker| error.contains(marker))
    })
  }

  fn into_record(mut self, kind: EntityKind) -> BillingRecord {
    match self.data.remove(kind.as_str()) {
      Some(Value::Object(record)) => BillingRecord(record),
      _ => BillingRecord::default(),
    }
  }
}

impl WeFactClient {
  pub fn new(config: &BillingConfig, http: &HttpConfig) -> Result<Self, BillingError> {
    let client = Client::builder()
      .timeout(http.timeout())
      .build()
      .map_err(|e| BillingError::Transport(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      url: config.base_url.clone(),
      api_key: config.api_key.clone(),
      retry: RetryPolicy::from_config(http),
    })
  }

  async fn request(
    &self,
    kind: EntityKind,
    action: &str,
    data: Value,
    idempotent: bool,
  ) -> Result<WeFactResponse, BillingError> {
    let mut body = json!({
      "api_key": self.api_key.expose_secret(),
      "controller": kind.as_str(),
      "action": action,
    });
    if let (Some(body), Value::Object(data)) = (body.as_object_mut(), data) {
      body.extend(data);
    }

    tracing::debug!("WeFact {} {}", kind, action);

    let response = self
      .retry
      .send(self.client.post(&self.url).json(&body), idempotent)
      .await
      .map_err(|e| BillingError::Transport(format!("{} {} failed: {}", kind, action, e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      tracing::error!("WeFact {} {} failed with status {}: {}", kind, action, status, body);
      return Err(BillingError::Api {
        status: status.as_u16(),
        body,
      });
    }

    response
      .json()
      .await
      .map_err(|e| BillingError::InvalidResponse(format!("{} {}: {}", kind, action, e)))
  }

  /// Runs a mutating action, turning an `error` status into [`BillingError::Rejected`].
  async fn command(
    &self,
    kind: EntityKind,
    action: &str,
    data: Value,
    idempotent: bool,
  ) -> Result<WeFactResponse, BillingError> {
    let response = self.request(kind, action, data, idempotent).await?;
    if !response.is_success() {
      return Err(BillingError::Rejected {
        controller: kind.to_string(),
        action: action.to_string(),
        errors: response.errors,
      });
    }
    Ok(response)
  }

  fn payload_data(payload: &BillingPayload) -> Result<Value, BillingError> {
    serde_json::to_value(payload)
      .map_err(|e| BillingError::InvalidResponse(format!("Failed to encode payload: {}", e)))
  }
}

#[async_trait]
impl BillingGateway for WeFactClient {
  async fn show(&self, kind: EntityKind, code: &str) -> Result<Lookup<BillingRecord>, BillingError> {
    let mut data = Map::new();
    data.insert(kind.code_field().to_string(), Value::from(code));
    let response = self.request(kind, "show", Value::Object(data), true).await?;

    if response.is_success() {
      Ok(Lookup::Found(response.into_record(kind)))
    } else if response.is_access_denied() {
      Err(BillingError::Rejected {
        controller: kind.to_string(),
        action: "show".to_string(),
        errors: response.errors,
      })
    } else {
      tracing::debug!("{} {} not found: {}", kind, code, response.errors.join("; "));
      Ok(Lookup::NotFound)
    }
  }

  async fn add(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError> {
    let kind = payload.kind();
    let response = self
      .command(kind, "add", Self::payload_data(payload)?, false)
      .await?;
    Ok(response.into_record(kind))
  }

  async fn edit(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError> {
    let kind = payload.kind();
    let response = self
      .command(kind, "edit", Self::payload_data(payload)?, false)
      .await?;
    Ok(response.into_record(kind))
  }

  async fn download(&self, invoice_code: &str) -> Result<EncodedPdf, BillingError> {
    let response = self
      .command(
        EntityKind::Invoice,
        "download",
        json!({ "InvoiceCode": invoice_code }),
        true,
      )
      .await?;

    response
      .into_record(EntityKind::Invoice)
      .text("Base64")
      .map(EncodedPdf)
      .ok_or_else(|| {
        BillingError::InvalidResponse(format!("Download of {} has no PDF content", invoice_code))
      })
  }

  async fn mark_as_paid(&self, invoice_code: &str) -> Result<BillingRecord, BillingError> {
    let response = self
      .command(
        EntityKind::Invoice,
        "markaspaid",
        json!({ "InvoiceCode": invoice_code }),
        false,
      )
      .await?;
    Ok(response.into_record(EntityKind::Invoice))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::{BillingInvoiceStatus, DebtorPayload};
  use secrecy::Secret;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer) -> WeFactClient {
    let config = BillingConfig {
      base_url: format!("{}/v2/", server.uri()),
      api_key: Secret::new("wefact-key".to_string()),
      invoice_code_prefix: "hs".to_string(),
      update_existing_debtors: false,
    };
    let http = HttpConfig {
      timeout_seconds: 5,
      max_retries: 2,
      backoff_millis: 0,
    };
    WeFactClient::new(&config, &http).unwrap()
  }

  async fn mock_response(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
      .and(path("/v2/"))
      .respond_with(ResponseTemplate::new(status).set_body_json(body))
      .mount(server)
      .await;
  }

  async fn sent_bodies(server: &MockServer) -> Vec<Value> {
    server
      .received_requests()
      .await
      .unwrap()
      .iter()
      .map(|request| serde_json::from_slice(&request.body).unwrap())
      .collect()
  }

  #[tokio::test]
  async fn test_show_found() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({
        "controller": "invoice",
        "action": "show",
        "status": "success",
        "date": "2026-10-16T10:00:00+02:00",
        "invoice": {"Identifier": "12", "InvoiceCode": "hs_20261016_INV-1001", "Status": "2"}
      }),
    )
    .await;

    let lookup = client(&server)
      .show(EntityKind::Invoice, "hs_20261016_INV-1001")
      .await
      .unwrap();

    let Lookup::Found(record) = lookup else {
      panic!("record expected");
    };
    assert_eq!(record.invoice_status(), Some(BillingInvoiceStatus::Sent));
    assert_eq!(
      sent_bodies(&server).await[0],
      json!({
        "api_key": "wefact-key",
        "controller": "invoice",
        "action": "show",
        "InvoiceCode": "hs_20261016_INV-1001"
      })
    );
  }

  #[tokio::test]
  async fn test_show_error_status_is_not_found() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({
        "controller": "debtor",
        "action": "show",
        "status": "error",
        "errors": ["Debiteur niet gevonden"]
      }),
    )
    .await;

    let lookup = client(&server).show(EntityKind::Debtor, "REL-42").await.unwrap();

    assert_eq!(lookup, Lookup::NotFound);
    assert_eq!(sent_bodies(&server).await[0]["DebtorCode"], "REL-42");
  }

  #[tokio::test]
  async fn test_show_with_invalid_api_key_is_rejected() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({
        "controller": "debtor",
        "action": "show",
        "status": "error",
        "errors": ["Ongeldige API key"]
      }),
    )
    .await;

    let result = client(&server).show(EntityKind::Debtor, "REL-42").await;

    match result {
      Err(BillingError::Rejected {
        controller,
        action,
        errors,
      }) => {
        assert_eq!(controller, "debtor");
        assert_eq!(action, "show");
        assert_eq!(errors, vec!["Ongeldige API key".to_string()]);
      }
      other => panic!("expected rejected show, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_show_is_retried_on_gateway_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(504))
      .up_to_n_times(1)
      .expect(1)
      .mount(&server)
      .await;
    mock_response(&server, 200, json!({"status": "success", "product": {"ProductCode": "A1"}})).await;

    let lookup = client(&server).show(EntityKind::Product, "A1").await.unwrap();

    assert!(lookup.is_found());
    assert_eq!(sent_bodies(&server).await.len(), 2);
  }

  #[tokio::test]
  async fn test_add_sends_payload_fields() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({"status": "success", "debtor": {"DebtorCode": "REL-42", "CompanyName": "Acme BV"}}),
    )
    .await;
    let payload = BillingPayload::Debtor(DebtorPayload {
      debtor_code: "REL-42".to_string(),
      company_name: Some("Acme BV".to_string()),
      address: None,
      zip_code: None,
      city: Some("Utrecht".to_string()),
      email_address: None,
    });

    let record = client(&server).add(&payload).await.unwrap();

    assert_eq!(record.text("CompanyName").as_deref(), Some("Acme BV"));
    let body = &sent_bodies(&server).await[0];
    assert_eq!(body["controller"], "debtor");
    assert_eq!(body["action"], "add");
    assert_eq!(body["DebtorCode"], "REL-42");
    assert_eq!(body["City"], "Utrecht");
    assert!(body.get("ZipCode").is_none());
  }

  #[tokio::test]
  async fn test_rejected_add_is_not_retried() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({"status": "error", "errors": ["Productcode is al in gebruik"]}),
    )
    .await;
    let payload = BillingPayload::Debtor(DebtorPayload {
      debtor_code: "REL-42".to_string(),
      company_name: None,
      address: None,
      zip_code: None,
      city: None,
      email_address: None,
    });

    let result = client(&server).add(&payload).await;

    match result {
      Err(BillingError::Rejected {
        controller,
        action,
        errors,
      }) => {
        assert_eq!(controller, "debtor");
        assert_eq!(action, "add");
        assert_eq!(errors, vec!["Productcode is al in gebruik".to_string()]);
      }
      other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(sent_bodies(&server).await.len(), 1);
  }

  #[tokio::test]
  async fn test_download_returns_base64_content() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({
        "status": "success",
        "invoice": {"Filename": "hs_20261016_INV-1001.pdf", "Base64": "JVBERi0xLjQ=", "MimeType": "application/pdf"}
      }),
    )
    .await;

    let pdf = client(&server).download("hs_20261016_INV-1001").await.unwrap();

    assert_eq!(pdf.decode().unwrap(), b"%PDF-1.4".to_vec());
  }

  #[tokio::test]
  async fn test_download_without_content_is_invalid() {
    let server = MockServer::start().await;
    mock_response(&server, 200, json!({"status": "success", "invoice": {}})).await;

    let result = client(&server).download("hs_20261016_INV-1001").await;

    assert!(matches!(result, Err(BillingError::InvalidResponse(_))));
  }

  #[tokio::test]
  async fn test_mark_as_paid() {
    let server = MockServer::start().await;
    mock_response(
      &server,
      200,
      json!({"status": "success", "invoice": {"InvoiceCode": "hs_20261016_INV-1001", "Status": "4"}}),
    )
    .await;

    let record = client(&server).mark_as_paid("hs_20261016_INV-1001").await.unwrap();

    assert_eq!(record.invoice_status(), Some(BillingInvoiceStatus::Paid));
    assert_eq!(sent_bodies(&server).await[0]["action"], "markaspaid");
  }

  #[tokio::test]
  async fn test_http_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
      .mount(&server)
      .await;

    let result = client(&server).show(EntityKind::Debtor, "REL-42").await;

    assert!(matches!(result, Err(BillingError::Api { status: 401, .. })));
  }
}
