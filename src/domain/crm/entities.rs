use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A CRM record as returned by the object APIs: an id plus loosely typed properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrmObject {
  pub id: String,
  #[serde(default)]
  pub properties: HashMap<String, Option<String>>,
}

impl CrmObject {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      properties: HashMap::new(),
    }
  }

  pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
    self
      .properties
      .insert(name.to_string(), Some(value.into()));
    self
  }

  /// Returns the property value, treating null and blank values as absent.
  pub fn property(&self, name: &str) -> Option<&str> {
    self
      .properties
      .get(name)
      .and_then(|value| value.as_deref())
      .map(str::trim)
      .filter(|value| !value.is_empty())
  }

  pub fn owned_property(&self, name: &str) -> Option<String> {
    self.property(name).map(str::to_string)
  }
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub results: Vec<T>,
  pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
  Invoices,
  Companies,
  Contacts,
  LineItems,
}

impl ObjectType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ObjectType::Invoices => "invoices",
      ObjectType::Companies => "companies",
      ObjectType::Contacts => "contacts",
      ObjectType::LineItems => "line_items",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
  pub id: String,
  pub url: Option<String>,
}
