//! Turns the flat field map of a submitted form into a validated purchase
//! order draft: required-field checks, indexed product-line extraction, and
//! total computation. Pure transformation; persistence and numbering happen
//! in the caller.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::purchase_order::{BillAttachment, Gst, NewPurchaseOrder, ProductLine};

pub const MISSING_REQUIRED_FIELDS: &str = "Missing required fields";
pub const AT_LEAST_ONE_PRODUCT: &str = "At least one product is required";

const REQUIRED_FIELDS: [&str; 5] = ["buyerName", "email", "purchaseDate", "platform", "gst"];

/// Flat `field name -> string value` mapping collected from the multipart
/// text parts. A field submitted with an empty value is present but empty;
/// the two cases are distinct for product-line scanning.
#[derive(Debug, Default)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }
}

impl<S: Into<String>> FromIterator<(S, S)> for FormFields {
    fn from_iter<T: IntoIterator<Item = (S, S)>>(iter: T) -> Self {
        FormFields(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A validated aggregate that has not yet been numbered or persisted.
#[derive(Debug)]
pub struct OrderDraft {
    pub buyer_name: String,
    pub email: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub platform: String,
    pub gst: Gst,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub products: Vec<ProductLine>,
    pub grand_total: BigDecimal,
    pub bill_upload: Option<BillAttachment>,
}

impl OrderDraft {
    /// Convert into an insertable row, stamping the assigned order number.
    /// The embedded product lines and attachment metadata become `jsonb`
    /// documents on the row.
    pub fn into_row(self, order_number: String) -> Result<NewPurchaseOrder, AppError> {
        let products = serde_json::to_value(&self.products)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let bill_upload = self
            .bill_upload
            .map(|b| serde_json::to_value(&b).map_err(|e| AppError::Internal(e.to_string())))
            .transpose()?;
        Ok(NewPurchaseOrder {
            id: Uuid::new_v4(),
            buyer_name: self.buyer_name,
            email: self.email,
            purchase_date: self.purchase_date,
            platform: self.platform,
            gst: self.gst.to_string(),
            invoice_number: self.invoice_number,
            notes: self.notes,
            products,
            grand_total: self.grand_total,
            order_number,
            bill_upload,
        })
    }
}

/// Decimal parse with a fallback, used for every submitted money field.
fn decimal_or(value: Option<&str>, default: BigDecimal) -> BigDecimal {
    value
        .and_then(|v| BigDecimal::from_str(v.trim()).ok())
        .unwrap_or(default)
}

/// Integer parse with a fallback, used for submitted quantities.
fn integer_or(value: Option<&str>, default: i32) -> i32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// An unparseable value yields `None`, the invalid-date marker; it is stored
/// as a null date rather than rejected.
fn parse_purchase_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Scan `productName{i}` for i = 1, 2, … and build the kept product lines.
///
/// Scanning stops at the first index where `productName{i}` is absent, even
/// if later indices exist; indices must be contiguous from 1. A line is kept
/// only if its name is non-empty and its unit price is strictly positive.
/// Lines failing the filter are dropped silently.
fn extract_product_lines(fields: &FormFields) -> Vec<ProductLine> {
    let mut lines = Vec::new();
    let mut index: u32 = 1;
    while let Some(name) = fields.get(&format!("productName{index}")) {
        let unit_price = decimal_or(
            fields.get(&format!("unitPrice{index}")),
            BigDecimal::zero(),
        );
        let quantity = integer_or(fields.get(&format!("quantity{index}")), 1);
        let total_price = decimal_or(
            fields.get(&format!("totalPrice{index}")),
            &unit_price * BigDecimal::from(quantity),
        );
        if !name.is_empty() && unit_price > BigDecimal::zero() {
            lines.push(ProductLine {
                product_name: name.to_string(),
                unit_price,
                quantity,
                total_price,
            });
        }
        index += 1;
    }
    lines
}

/// Validate the submitted fields and build the draft aggregate.
pub fn assemble(
    fields: &FormFields,
    bill_upload: Option<BillAttachment>,
) -> Result<OrderDraft, AppError> {
    if REQUIRED_FIELDS
        .iter()
        .any(|f| fields.non_empty(f).is_none())
    {
        return Err(AppError::Validation(MISSING_REQUIRED_FIELDS.to_string()));
    }

    let gst: Gst = fields
        .non_empty("gst")
        .unwrap_or_default()
        .parse()
        .map_err(|_| AppError::Validation("gst must be \"Yes\" or \"No\"".to_string()))?;

    let products = extract_product_lines(fields);
    if products.is_empty() {
        return Err(AppError::Validation(AT_LEAST_ONE_PRODUCT.to_string()));
    }

    let grand_total = fields
        .get("grandTotal")
        .and_then(|v| BigDecimal::from_str(v.trim()).ok())
        .unwrap_or_else(|| {
            products
                .iter()
                .fold(BigDecimal::zero(), |acc, l| acc + &l.total_price)
        });

    Ok(OrderDraft {
        buyer_name: fields.non_empty("buyerName").unwrap_or_default().to_string(),
        email: fields.non_empty("email").unwrap_or_default().to_string(),
        purchase_date: fields
            .non_empty("purchaseDate")
            .and_then(parse_purchase_date),
        platform: fields.non_empty("platform").unwrap_or_default().to_string(),
        gst,
        invoice_number: fields.get("invoiceNumber").map(str::to_string),
        notes: fields.get("notes").map(str::to_string),
        products,
        grand_total,
        bill_upload,
    })
}

/// Re-read the embedded `products` document as typed lines.
pub fn product_lines_from_document(document: &Value) -> Result<Vec<ProductLine>, AppError> {
    serde_json::from_value(document.clone()).map_err(|e| AppError::Internal(e.to_string()))
}
