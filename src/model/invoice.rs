use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{lenient_f64, text_or_empty};

/// Invoice status. The store holds free text; the known values get variants
/// and anything else is carried through untouched. A null column reads as the
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
    Other(String),
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "overdue" => Self::Overdue,
            _ => Self::Other(value),
        }
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Self::default(),
            Some(Value::String(s)) => Self::from(s),
            Some(other) => Self::Other(other.to_string()),
        })
    }
}

impl From<InvoiceStatus> for String {
    fn from(value: InvoiceStatus) -> Self {
        value.as_str().to_string()
    }
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.trim().to_lowercase()))
    }
}

/// `name` column pulled in through a nested select such as `company:companies(name)`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddedName {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
}

/// A row of the `invoices` table as read back from the store.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Invoice {
    pub id: Uuid,
    pub company_id: Uuid,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub number: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub notes: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub terms: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub payment_terms: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub subtotal: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tax_total: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub discount_total: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub company: Option<EmbeddedName>,
    #[serde(default, skip_serializing)]
    pub client: Option<EmbeddedName>,
}

impl Invoice {
    pub fn company_name(&self) -> &str {
        self.company.as_ref().map_or("", |c| c.name.as_str())
    }

    pub fn client_name(&self) -> &str {
        self.client.as_ref().map_or("", |c| c.name.as_str())
    }
}

/// Insert/update payload for the `invoices` table.
#[derive(Debug, Serialize, Clone)]
pub struct InvoiceRecord {
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: String,
    pub terms: String,
    pub payment_terms: String,
    pub status: InvoiceStatus,
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_total: f64,
    pub total: f64,
}

/// A row of the `invoice_items` table.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InvoiceItem {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub invoice_id: Uuid,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tax_rate: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub discount_rate: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub subtotal: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tax_amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub discount_amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
}

/// Insert payload for the `invoice_items` table.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewInvoiceItem {
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_tolerates_null_and_non_text() {
        let status: InvoiceStatus = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(status, InvoiceStatus::Draft);
        let status: InvoiceStatus = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(status, InvoiceStatus::Other("3".to_string()));
    }

    #[test]
    fn status_keeps_unknown_values() {
        let status: InvoiceStatus = serde_json::from_value(json!("void")).unwrap();
        assert_eq!(status, InvoiceStatus::Other("void".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("void"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("PAID".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert_eq!(" pending ".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Pending);
    }

    #[test]
    fn invoice_row_tolerates_nulls_and_string_totals() {
        let row = json!({
            "id": "6b0d2c4e-4f8a-4bb2-9a53-2d2b1f1c6f01",
            "company_id": "0a6f1d57-2c3e-4e3b-8d38-ffb7bb1d9a11",
            "client_id": null,
            "number": "INV-2026-0001",
            "issue_date": "2026-03-01",
            "due_date": null,
            "notes": null,
            "status": "pending",
            "total": "105.50",
            "tax_total": "oops",
            "company": {"name": "Acme"}
        });
        let invoice: Invoice = serde_json::from_value(row).unwrap();
        assert_eq!(invoice.total, 105.5);
        assert_eq!(invoice.tax_total, 0.0);
        assert_eq!(invoice.notes, "");
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.company_name(), "Acme");
        assert_eq!(invoice.client_name(), "");
    }
}
