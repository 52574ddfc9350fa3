use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::purchase_orders;

/// One purchased item, embedded in its parent order's `products` document.
///
/// Prices serialize as decimal strings (e.g. "9.99") to avoid floating-point
/// issues, matching the API's response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub total_price: BigDecimal,
}

/// Reference to a stored bill image, embedded in the order's `bill_upload`
/// document. The blob itself lives on disk under the upload directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillAttachment {
    pub filename: String,
    pub path: String,
    pub size: i64,
    pub mimetype: String,
}

/// GST flag, restricted to the literal strings "Yes" and "No" on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gst {
    Yes,
    No,
}

impl FromStr for Gst {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Gst::Yes),
            "No" => Ok(Gst::No),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Gst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gst::Yes => f.write_str("Yes"),
            Gst::No => f.write_str("No"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = purchase_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub buyer_name: String,
    pub email: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub platform: String,
    pub gst: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub products: Value,
    pub grand_total: BigDecimal,
    pub order_number: String,
    pub bill_upload: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = purchase_orders)]
pub struct NewPurchaseOrder {
    pub id: Uuid,
    pub buyer_name: String,
    pub email: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub platform: String,
    pub gst: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub products: Value,
    pub grand_total: BigDecimal,
    pub order_number: String,
    pub bill_upload: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gst_parses_only_the_literal_strings() {
        assert_eq!("Yes".parse::<Gst>(), Ok(Gst::Yes));
        assert_eq!("No".parse::<Gst>(), Ok(Gst::No));
        assert!("yes".parse::<Gst>().is_err());
        assert!("".parse::<Gst>().is_err());
        assert!("Maybe".parse::<Gst>().is_err());
    }

    #[test]
    fn product_line_serializes_camel_case() {
        let line = ProductLine {
            product_name: "Widget".to_string(),
            unit_price: BigDecimal::from(10),
            quantity: 2,
            total_price: BigDecimal::from(20),
        };
        let value = serde_json::to_value(&line).unwrap();
        assert!(value.get("productName").is_some());
        assert!(value.get("unitPrice").is_some());
        assert!(value.get("totalPrice").is_some());
        assert_eq!(value["quantity"], 2);
    }

    #[test]
    fn bill_attachment_round_trips() {
        let bill = BillAttachment {
            filename: "1700000000000-ab12.png".to_string(),
            path: "uploads/1700000000000-ab12.png".to_string(),
            size: 1024,
            mimetype: "image/png".to_string(),
        };
        let value = serde_json::to_value(&bill).unwrap();
        let back: BillAttachment = serde_json::from_value(value).unwrap();
        assert_eq!(back, bill);
    }
}
