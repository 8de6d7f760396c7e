//! Money formatting for terminal output. Values are only rounded here.

/// Insert thousands separators into a run of ASCII digits.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Two decimal places with thousands separators, e.g. `$1,250.50`.
pub fn format_money(value: f64, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value);
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let grouped = group_digits(whole.trim_start_matches('-'));

    if negative {
        format!("-{}{}.{}", currency_symbol, grouped, frac)
    } else {
        format!("{}{}.{}", currency_symbol, grouped, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_digits("0"), "0");
        assert_eq!(group_digits("999"), "999");
        assert_eq!(group_digits("1250"), "1,250");
        assert_eq!(group_digits("9223372036854775808"), "9,223,372,036,854,775,808");
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(105.0, "$"), "$105.00");
        assert_eq!(format_money(1250.5, "€"), "€1,250.50");
        assert_eq!(format_money(999_999.999, "$"), "$1,000,000.00");
        assert_eq!(format_money(0.1 + 0.2, "£"), "£0.30");
        assert_eq!(format_money(-42.5, "$"), "-$42.50");
    }

    #[test]
    fn money_beyond_i64_keeps_its_digits() {
        assert_eq!(format_money(1e19, "$"), "$10,000,000,000,000,000,000.00");
        assert_eq!(format_money(-1e20, "$"), "-$100,000,000,000,000,000,000.00");
    }
}
