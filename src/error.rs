use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Config directory not found at {0}. Run 'invoicetree init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Backend URL is not configured. Set [backend] url in config.toml or INVOICETREE_URL.")]
    BackendNotConfigured,

    #[error("Not signed in. Run 'invoicetree login' or 'invoicetree signup' first.")]
    NotSignedIn,

    #[error("No company set up yet. Run 'invoicetree onboard --name <name>' first.")]
    OnboardingRequired,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Backend request failed ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("Unexpected response from backend: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Company '{0}' not found")]
    CompanyNotFound(String),

    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Invoice '{0}' not found")]
    InvoiceNotFound(String),

    #[error("Invalid invoice index '{0}'. Use 'invoicetree invoices list' to see available invoices.")]
    InvalidInvoiceIndex(String),

    #[error("Invalid item format '{0}'. Expected 'description:quantity:unit_price[:tax[:discount]]'")]
    InvalidItemFormat(String),

    #[error("Invalid {field} '{value}' for item '{item}': {reason}")]
    InvalidItemValue {
        item: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("No items specified. Use --item <description>:<qty>:<price> to add line items.")]
    NoItems,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unsupported currency '{0}'. Use USD, EUR, GBP or COP.")]
    UnsupportedCurrency(String),

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
