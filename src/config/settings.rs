use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::{read_toml, write_toml};
use crate::error::{InvoiceError, Result};
use crate::invoice::has_seq_placeholder;

/// Upper bound for `due_days` (ten years).
pub const MAX_DUE_DAYS: u32 = 3650;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cop,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd | Currency::Cop => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cop => "COP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.symbol())
    }
}

impl FromStr for Currency {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "COP" => Ok(Currency::Cop),
            _ => Err(InvoiceError::UnsupportedCurrency(s.to_string())),
        }
    }
}

/// Local preferences, kept in settings.toml and never sent to the backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_currency: Currency,
    pub default_payment_terms: String,
    pub default_notes: String,
    pub default_terms: String,
    pub email_notifications: bool,
    pub number_format: String,
    pub due_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: Currency::Usd,
            default_payment_terms: "Net 30".to_string(),
            default_notes: String::new(),
            default_terms: String::new(),
            email_notifications: true,
            number_format: "INV-{year}-{seq:04}".to_string(),
            due_days: 30,
        }
    }
}

impl Settings {
    /// Missing file means defaults.
    pub fn load(config_dir: &Path) -> Result<Settings> {
        let path = config_dir.join("settings.toml");
        if !path.exists() {
            return Ok(Settings::default());
        }
        read_toml(path)
    }

    pub fn save(&self, config_dir: &Path) -> Result<()> {
        write_toml(config_dir.join("settings.toml"), self)
    }

    pub fn currency_symbol(&self) -> &'static str {
        self.default_currency.symbol()
    }

    /// Assign one preference by its settings.toml key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_currency" | "currency" => self.default_currency = value.parse()?,
            "default_payment_terms" | "payment_terms" => {
                self.default_payment_terms = value.to_string()
            }
            "default_notes" | "notes" => self.default_notes = value.to_string(),
            "default_terms" | "terms" => self.default_terms = value.to_string(),
            "email_notifications" => {
                self.email_notifications = parse_flag(value).ok_or_else(|| {
                    InvoiceError::Validation(format!(
                        "email_notifications must be true or false, got '{value}'"
                    ))
                })?
            }
            "number_format" => {
                if !has_seq_placeholder(value) {
                    return Err(InvoiceError::Validation(
                        "number_format must contain a {seq:03}, {seq:04} or {seq:05} placeholder"
                            .to_string(),
                    ));
                }
                self.number_format = value.to_string()
            }
            "due_days" => {
                self.due_days = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|days| *days <= MAX_DUE_DAYS)
                    .ok_or_else(|| {
                        InvoiceError::Validation(format!(
                            "due_days must be a whole number from 0 to {MAX_DUE_DAYS}, got '{value}'"
                        ))
                    })?
            }
            _ => return Err(InvoiceError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
