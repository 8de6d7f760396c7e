mod document;
mod editor;
mod registry;
mod totals;

pub const TABLE: &str = "invoices";
pub const ITEMS_TABLE: &str = "invoice_items";

pub use document::{load_document, DocumentLine, InvoiceDocument};
pub use editor::{
    create_invoice, format_invoice_number, has_seq_placeholder, next_invoice_number,
    parse_item_input, update_invoice, InvoiceDraft,
};
pub use registry::{
    delete_invoice, get_invoice, get_items, list_invoices, resolve_invoice, set_status,
};
pub use totals::{InvoiceTotals, LineAmounts, LineItemInput};
