mod client;
mod company;
mod invoice;

pub use client::{Client, NewClient};
pub use company::{Company, NewCompany};
pub use invoice::{Invoice, InvoiceItem, InvoiceRecord, InvoiceStatus, NewInvoiceItem};

use serde::{Deserialize, Deserializer};

/// Read a monetary/numeric column that the store may hand back as a number,
/// a numeric string, or null. Anything unparseable is treated as zero.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_or_zero(&value))
}

pub(crate) fn number_or_zero(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Nullable text columns come back as null; callers only ever want a string.
pub fn text_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_or_zero_accepts_numbers_and_numeric_strings() {
        assert_eq!(number_or_zero(&json!(12.5)), 12.5);
        assert_eq!(number_or_zero(&json!("99.10")), 99.10);
        assert_eq!(number_or_zero(&json!(" 7 ")), 7.0);
    }

    #[test]
    fn number_or_zero_maps_garbage_to_zero() {
        assert_eq!(number_or_zero(&json!("abc")), 0.0);
        assert_eq!(number_or_zero(&json!(null)), 0.0);
        assert_eq!(number_or_zero(&json!({"total": 4})), 0.0);
        assert_eq!(number_or_zero(&json!("NaN")), 0.0);
    }
}
