//! CRM property names read by the sync.

pub mod invoice {
  pub const STATUS: &str = "hs_invoice_status";
  pub const AMOUNT_BILLED: &str = "hs_amount_billed";
  pub const BALANCE_DUE: &str = "hs_balance_due";
  pub const INVOICE_DATE: &str = "hs_invoice_date";
  pub const DUE_DATE: &str = "hs_due_date";
  pub const NUMBER: &str = "hs_number";
  pub const SUBJECT: &str = "betreft_factuurniveau";
  pub const REFERENCE: &str = "referentie_wefact__factuur_";
  pub const ORGANIZATION: &str = "organisatie__factuur_";
  pub const ATTENTION_TO: &str = "ter_attentie_van__factuur_";
  pub const ADDRESS: &str = "adres__factuur_";
  pub const ZIP_CODE: &str = "postcode__factuur_";
  pub const CITY: &str = "plaats__factuur_";
  pub const COUNTRY: &str = "land__factuur_";

  pub const ALL: &[&str] = &[
    STATUS,
    AMOUNT_BILLED,
    BALANCE_DUE,
    INVOICE_DATE,
    DUE_DATE,
    NUMBER,
    SUBJECT,
    REFERENCE,
    ORGANIZATION,
    ATTENTION_TO,
    ADDRESS,
    ZIP_CODE,
    CITY,
    COUNTRY,
  ];
}

pub mod company {
  pub const RELATION_NUMBER: &str = "relatie_nummer";
  pub const NAME: &str = "name";
  pub const ADDRESS: &str = "address";
  pub const ZIP: &str = "zip";
  pub const CITY: &str = "city";
  pub const EMAIL: &str = "email";

  pub const ALL: &[&str] = &[RELATION_NUMBER, NAME, ADDRESS, ZIP, CITY, EMAIL];
}

pub mod contact {
  pub const LAST_NAME: &str = "lastname";
  pub const INVOICE_ANNOTATION: &str = "factuur_toelichting";

  pub const ALL: &[&str] = &[LAST_NAME, INVOICE_ANNOTATION];
}

pub mod line_item {
  pub const SKU: &str = "hs_sku";
  pub const NAME: &str = "name";
  pub const AMOUNT: &str = "amount";
  pub const QUANTITY: &str = "quantity";
  pub const PRICE: &str = "price";
  pub const TAX_RATE_GROUP_ID: &str = "hs_tax_rate_group_id";
  /// Tax rate as a fraction, e.g. `0.21`.
  pub const TAX_FRACTION: &str = "btw";
  pub const DISCOUNT: &str = "discount";
  pub const DISCOUNT_PERCENTAGE: &str = "hs_discount_percentage";

  pub const ALL: &[&str] = &[
    SKU,
    NAME,
    AMOUNT,
    QUANTITY,
    PRICE,
    TAX_RATE_GROUP_ID,
    TAX_FRACTION,
    DISCOUNT,
    DISCOUNT_PERCENTAGE,
  ];
}
