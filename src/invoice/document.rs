use serde::Serialize;
use uuid::Uuid;

use super::registry::get_items;
use crate::backend::{select_as, DataStore, Query};
use crate::clients::get_client;
use crate::companies;
use crate::error::{InvoiceError, Result};
use crate::model::{Client, Company, Invoice};

/// A line as printed.
#[derive(Debug, Serialize)]
pub struct DocumentLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub tax_rate: f64,
    pub discount_rate: f64,
    pub amount: f64,
}

/// Complete invoice data for PDF generation: the invoice with its company,
/// client and items resolved.
#[derive(Debug, Serialize)]
pub struct InvoiceDocument {
    pub number: String,
    pub status: String,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub company: Company,
    pub client: Client,
    pub items: Vec<DocumentLine>,
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_total: f64,
    pub total: f64,
    pub currency_symbol: String,
    pub notes: String,
    pub terms: String,
    pub payment_terms: String,
}

fn get_company<S: DataStore + ?Sized>(store: &S, id: Uuid) -> Result<Company> {
    select_as::<Company, _>(store, &Query::table(companies::TABLE).eq("id", id))?
        .pop()
        .ok_or_else(|| InvoiceError::CompanyNotFound(id.to_string()))
}

/// Fetch the company, client and items of `invoice` and assemble the document.
/// Totals are printed as stored on the invoice row.
pub fn load_document<S: DataStore + ?Sized>(
    store: &S,
    invoice: &Invoice,
    currency_symbol: &str,
) -> Result<InvoiceDocument> {
    let company = get_company(store, invoice.company_id)?;
    let client_id = invoice
        .client_id
        .ok_or_else(|| InvoiceError::ClientNotFound(format!("for invoice {}", invoice.number)))?;
    let client = get_client(store, client_id)?;
    let items = get_items(store, invoice.id)?;

    Ok(InvoiceDocument {
        number: invoice.number.clone(),
        status: invoice.status.to_string(),
        issue_date: invoice
            .issue_date
            .map(|d| d.format("%B %d, %Y").to_string())
            .unwrap_or_default(),
        due_date: invoice.due_date.map(|d| d.format("%B %d, %Y").to_string()),
        company,
        client,
        items: items
            .into_iter()
            .map(|item| DocumentLine {
                amount: item.quantity * item.unit_price,
                description: item.description,
                quantity: item.quantity,
                unit_price: item.unit_price,
                tax_rate: item.tax_rate,
                discount_rate: item.discount_rate,
            })
            .collect(),
        subtotal: invoice.subtotal,
        tax_total: invoice.tax_total,
        discount_total: invoice.discount_total,
        total: invoice.total,
        currency_symbol: currency_symbol.to_string(),
        notes: invoice.notes.clone(),
        terms: invoice.terms.clone(),
        payment_terms: invoice.payment_terms.clone(),
    })
}
