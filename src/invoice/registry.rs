use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{ITEMS_TABLE, TABLE};
use crate::backend::{select_as, DataStore, Query};
use crate::error::{InvoiceError, Result};
use crate::model::{Invoice, InvoiceItem, InvoiceStatus};

/// Invoices of the given companies, newest first, with company and client names.
pub fn list_invoices<S: DataStore + ?Sized>(store: &S, company_ids: &[Uuid]) -> Result<Vec<Invoice>> {
    if company_ids.is_empty() {
        return Ok(Vec::new());
    }
    select_as(
        store,
        &Query::table(TABLE)
            .select("*, company:companies(name), client:clients(name)")
            .in_list("company_id", company_ids)
            .order("created_at", false),
    )
}

pub fn get_invoice<S: DataStore + ?Sized>(store: &S, id: Uuid) -> Result<Invoice> {
    select_as::<Invoice, _>(
        store,
        &Query::table(TABLE)
            .select("*, company:companies(name), client:clients(name)")
            .eq("id", id),
    )?
    .pop()
    .ok_or_else(|| InvoiceError::InvoiceNotFound(id.to_string()))
}

pub fn get_items<S: DataStore + ?Sized>(store: &S, invoice_id: Uuid) -> Result<Vec<InvoiceItem>> {
    select_as(store, &Query::table(ITEMS_TABLE).eq("invoice_id", invoice_id))
}

/// Resolve an invoice reference: a 1-based index into the newest-first list,
/// or the invoice number.
pub fn resolve_invoice<'a>(invoices: &'a [Invoice], reference: &str) -> Result<&'a Invoice> {
    if let Ok(idx) = reference.parse::<usize>() {
        if idx == 0 || idx > invoices.len() {
            return Err(InvoiceError::InvalidInvoiceIndex(reference.to_string()));
        }
        return Ok(&invoices[idx - 1]);
    }

    invoices
        .iter()
        .find(|inv| inv.number == reference)
        .ok_or_else(|| InvoiceError::InvoiceNotFound(reference.to_string()))
}

/// Delete an invoice row. Its items go with it through the store's cascade.
pub fn delete_invoice<S: DataStore + ?Sized>(store: &S, invoice: &Invoice) -> Result<()> {
    store.delete(&Query::table(TABLE).eq("id", invoice.id))?;
    info!(invoice = %invoice.id, number = %invoice.number, "invoice deleted");
    Ok(())
}

/// Change only the status column; totals and items are untouched.
pub fn set_status<S: DataStore + ?Sized>(
    store: &S,
    invoice: &Invoice,
    status: &InvoiceStatus,
) -> Result<()> {
    store.update(
        &Query::table(TABLE).eq("id", invoice.id),
        json!({ "status": status }),
    )?;
    info!(invoice = %invoice.id, %status, "invoice status changed");
    Ok(())
}
