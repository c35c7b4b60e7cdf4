use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

use super::entities::{LineItem, TaxRates};
use super::errors::LineItemError;
use super::value_objects::Sku;
use crate::domain::crm::CrmObject;
use crate::domain::crm::properties::line_item;

/// Result of reconciling every line item of one invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemReconciliation {
  pub line_items: Vec<LineItem>,
  pub errors: Vec<LineItemError>,
}

impl LineItemReconciliation {
  pub fn is_clean(&self) -> bool {
    self.errors.is_empty()
  }
}

/// Turns raw CRM line item properties into validated [`LineItem`]s.
///
/// Pure transformation: the tax rate table is fetched up front and handed in.
pub struct LineItemReconciler {
  tax_rates: TaxRates,
}

impl LineItemReconciler {
  pub fn new(tax_rates: TaxRates) -> Self {
    Self { tax_rates }
  }

  /// Reconciles all items; a failing item is recorded and excluded, its siblings continue.
  pub fn reconcile_all<'a>(
    &self,
    objects: impl IntoIterator<Item = &'a CrmObject>,
  ) -> LineItemReconciliation {
    let mut result = LineItemReconciliation::default();

    for object in objects {
      match self.reconcile(object) {
        Ok(item) => result.line_items.push(item),
        Err(e) => {
          tracing::warn!("{}", e);
          result.errors.push(e);
        }
      }
    }

    result
  }

  pub fn reconcile(&self, object: &CrmObject) -> Result<LineItem, LineItemError> {
    let id = object.id.clone();

    let sku = object
      .property(line_item::SKU)
      .and_then(|value| Sku::new(value.to_string()).ok())
      .ok_or_else(|| LineItemError::MissingSku {
        line_item_id: id.clone(),
      })?;

    let overflow = || LineItemError::Overflow {
      line_item_id: id.clone(),
    };

    let quantity = parse_quantity(object)?;
    let price = decimal_property(object, line_item::PRICE)?.unwrap_or(Decimal::ZERO);
    let gross = Decimal::from(quantity)
      .checked_mul(price)
      .ok_or_else(overflow)?;
    let discount_amount = decimal_property(object, line_item::DISCOUNT)?.unwrap_or(Decimal::ZERO);
    let net = gross.checked_sub(discount_amount).ok_or_else(overflow)?;
    let amount = decimal_property(object, line_item::AMOUNT)?.unwrap_or(net);

    let tax_percentage = match decimal_property(object, line_item::TAX_FRACTION)? {
      Some(fraction) => fraction
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(overflow)?,
      None => Decimal::ZERO,
    };

    // Upstream percentage is only trusted when no discount amount is given
    let discount_percentage = if discount_amount.is_zero() {
      decimal_property(object, line_item::DISCOUNT_PERCENTAGE)?.unwrap_or(Decimal::ZERO)
    } else if gross.is_zero() {
      return Err(LineItemError::DiscountOnZeroValue {
        line_item_id: id.clone(),
        discount: discount_amount,
      });
    } else {
      discount_percentage(discount_amount, quantity, price).ok_or_else(overflow)?
    };

    let tax_rate_group_id = object.owned_property(line_item::TAX_RATE_GROUP_ID);
    let effective_tax_percentage = self.effective_tax_percentage(
      &id,
      tax_rate_group_id.as_deref(),
      tax_percentage,
    );

    Ok(LineItem {
      name: object
        .owned_property(line_item::NAME)
        .unwrap_or_else(|| sku.value().to_string()),
      id,
      sku,
      quantity,
      price,
      amount,
      tax_rate_group_id,
      tax_percentage,
      effective_tax_percentage,
      discount_amount,
      discount_percentage,
    })
  }

  /// Resolves the tax percentage through the tax rate table.
  ///
  /// No tax group means 0%. A tax group missing from the table keeps the line
  /// item's own normalized percentage.
  fn effective_tax_percentage(
    &self,
    line_item_id: &str,
    group_id: Option<&str>,
    fallback: Decimal,
  ) -> Decimal {
    let Some(group_id) = group_id else {
      return Decimal::ZERO;
    };

    match self.tax_rates.get(group_id) {
      Some(rate) => rate.percentage,
      None => {
        tracing::warn!(
          "Unknown tax group {} on line item {}, using {}%",
          group_id,
          line_item_id,
          fallback
        );
        fallback
      }
    }
  }
}

/// `round(discount_amount / (quantity * price) * 100, 2)`, or `None` for a
/// zero-value line or when the result does not fit a `Decimal`.
pub fn discount_percentage(discount_amount: Decimal, quantity: u32, price: Decimal) -> Option<Decimal> {
  let gross = Decimal::from(quantity).checked_mul(price)?;
  discount_amount
    .checked_div(gross)?
    .checked_mul(Decimal::ONE_HUNDRED)
    .map(|percentage| percentage.round_dp(2))
}

fn parse_quantity(object: &CrmObject) -> Result<u32, LineItemError> {
  let raw = object.property(line_item::QUANTITY).unwrap_or_default();
  Decimal::from_str(raw)
    .ok()
    .filter(|quantity| quantity.fract().is_zero() && !quantity.is_sign_negative())
    .and_then(|quantity| quantity.to_u32())
    .ok_or_else(|| LineItemError::InvalidQuantity {
      line_item_id: object.id.clone(),
      value: raw.to_string(),
    })
}

fn decimal_property(
  object: &CrmObject,
  field: &'static str,
) -> Result<Option<Decimal>, LineItemError> {
  object
    .property(field)
    .map(|value| {
      Decimal::from_str(value).map_err(|_| LineItemError::InvalidNumber {
        line_item_id: object.id.clone(),
        field,
        value: value.to_string(),
      })
    })
    .transpose()
}
