use serde::{Deserialize, Serialize};

/// One line item as entered. Every numeric field defaults to zero so a
/// missing value can never fault the computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Percentage, 0-100.
    pub tax_rate: f64,
    /// Percentage, 0-100.
    pub discount_rate: f64,
}

/// Derived amounts for a single line. Not rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LineAmounts {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
}

impl LineItemInput {
    /// Tax and discount are both taken from the line's own subtotal; neither
    /// reduces the base of the other.
    pub fn amounts(&self) -> LineAmounts {
        let subtotal = self.quantity * self.unit_price;
        let tax_amount = subtotal * (self.tax_rate / 100.0);
        let discount_amount = subtotal * (self.discount_rate / 100.0);
        LineAmounts {
            subtotal,
            tax_amount,
            discount_amount,
            total: subtotal + tax_amount - discount_amount,
        }
    }
}

/// Invoice-level aggregates stored on the `invoices` row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_total: f64,
    pub total: f64,
}

impl InvoiceTotals {
    pub fn from_items(items: &[LineItemInput]) -> Self {
        let (subtotal, tax_total, discount_total) =
            items
                .iter()
                .map(LineItemInput::amounts)
                .fold((0.0, 0.0, 0.0), |(s, t, d), line| {
                    (s + line.subtotal, t + line.tax_amount, d + line.discount_amount)
                });

        Self {
            subtotal,
            tax_total,
            discount_total,
            total: subtotal + tax_total - discount_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, unit_price: f64, tax_rate: f64, discount_rate: f64) -> LineItemInput {
        LineItemInput {
            description: "work".to_string(),
            quantity,
            unit_price,
            tax_rate,
            discount_rate,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn worked_example() {
        let line = item(2.0, 50.0, 10.0, 5.0).amounts();
        assert_eq!(line.subtotal, 100.0);
        assert_eq!(line.tax_amount, 10.0);
        assert_eq!(line.discount_amount, 5.0);
        assert_eq!(line.total, 105.0);
    }

    #[test]
    fn discount_does_not_reduce_tax_base() {
        let line = item(1.0, 200.0, 20.0, 50.0).amounts();
        assert_eq!(line.tax_amount, 40.0);
        assert_eq!(line.discount_amount, 100.0);
        assert_eq!(line.total, 140.0);
    }

    #[test]
    fn line_total_matches_closed_form() {
        let cases = [
            (0.0, 10.0, 0.0, 0.0),
            (3.0, 19.99, 7.5, 0.0),
            (1.5, 80.0, 0.0, 12.5),
            (12.0, 0.35, 100.0, 100.0),
            (7.0, 13.0, 21.0, 3.0),
        ];
        for (q, p, t, d) in cases {
            let line = item(q, p, t, d).amounts();
            assert!(close(line.total, q * p * (1.0 + t / 100.0 - d / 100.0)));
        }
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let parsed: LineItemInput =
            serde_json::from_str(r#"{"description":"Setup","unit_price":40}"#).unwrap();
        assert_eq!(parsed.quantity, 0.0);
        assert_eq!(parsed.amounts(), LineAmounts::default());
    }

    #[test]
    fn empty_item_set_sums_to_zero() {
        assert_eq!(InvoiceTotals::from_items(&[]), InvoiceTotals::default());
    }

    #[test]
    fn aggregates_are_sums_of_lines() {
        let items = vec![
            item(2.0, 50.0, 10.0, 5.0),
            item(1.0, 300.0, 0.0, 10.0),
            item(4.0, 12.5, 8.0, 0.0),
        ];
        let totals = InvoiceTotals::from_items(&items);
        let lines: Vec<_> = items.iter().map(LineItemInput::amounts).collect();

        assert!(close(totals.subtotal, lines.iter().map(|l| l.subtotal).sum()));
        assert!(close(totals.tax_total, lines.iter().map(|l| l.tax_amount).sum()));
        assert!(close(totals.discount_total, lines.iter().map(|l| l.discount_amount).sum()));
        assert!(close(totals.total, lines.iter().map(|l| l.total).sum()));
        assert!(close(totals.total, 450.0 + 14.0 - 35.0));
    }
}
