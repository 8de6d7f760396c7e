pub mod backend;
pub mod clients;
pub mod companies;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod invoice;
pub mod model;
pub mod pdf;
pub mod session;
pub mod validate;

pub use config::{Config, Settings};
pub use dashboard::DashboardStats;
pub use error::{InvoiceError, Result};
pub use invoice::{InvoiceTotals, LineItemInput};
pub use session::{GateState, SessionGate};
