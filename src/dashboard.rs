//! Dashboard statistics over the user's companies.

use serde::Deserialize;
use uuid::Uuid;

use crate::backend::{select_as, DataStore, Query};
use crate::clients::count_clients;
use crate::companies::company_ids;
use crate::error::Result;
use crate::invoice;
use crate::model::{lenient_f64, InvoiceStatus};

/// The slice of an invoice row the dashboard reads.
#[derive(Debug, Deserialize, Clone)]
pub struct DashboardInvoice {
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashboardStats {
    pub total_invoices: usize,
    pub pending_invoices: usize,
    pub total_revenue: f64,
    pub active_clients: u64,
}

impl DashboardStats {
    /// Revenue counts "paid" invoices only.
    pub fn aggregate(invoices: &[DashboardInvoice], client_count: u64) -> Self {
        Self {
            total_invoices: invoices.len(),
            pending_invoices: invoices
                .iter()
                .filter(|inv| inv.status == InvoiceStatus::Pending)
                .count(),
            total_revenue: invoices
                .iter()
                .filter(|inv| inv.status == InvoiceStatus::Paid)
                .map(|inv| inv.total)
                .sum(),
            active_clients: client_count,
        }
    }
}

/// Fetch and aggregate. A user without companies gets all zeros.
pub fn fetch_dashboard<S: DataStore + ?Sized>(store: &S, user_id: Uuid) -> Result<DashboardStats> {
    let companies = company_ids(store, user_id)?;
    if companies.is_empty() {
        return Ok(DashboardStats::default());
    }

    let invoices: Vec<DashboardInvoice> = select_as(
        store,
        &Query::table(invoice::TABLE)
            .select("id, total, status")
            .in_list("company_id", &companies),
    )?;
    let clients = count_clients(store, &companies)?;

    Ok(DashboardStats::aggregate(&invoices, clients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryStore;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<DashboardInvoice> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn revenue_counts_only_paid() {
        let invoices = rows(json!([
            { "total": 100, "status": "paid" },
            { "total": 50, "status": "pending" },
        ]));
        let stats = DashboardStats::aggregate(&invoices, 3);
        assert_eq!(stats.total_revenue, 100.0);
        assert_eq!(stats.pending_invoices, 1);
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.active_clients, 3);
    }

    #[test]
    fn malformed_totals_contribute_zero() {
        let invoices = rows(json!([
            { "total": "abc", "status": "paid" },
            { "total": null, "status": "paid" },
            { "status": "paid" },
            { "total": "250.75", "status": "paid" },
            { "total": 40, "status": "overdue" },
            { "total": 10, "status": "draft" },
        ]));
        let stats = DashboardStats::aggregate(&invoices, 0);
        assert_eq!(stats.total_revenue, 250.75);
        assert_eq!(stats.total_invoices, 6);
        assert_eq!(stats.pending_invoices, 0);
    }

    #[test]
    fn empty_set_is_all_zero() {
        assert_eq!(DashboardStats::aggregate(&[], 0), DashboardStats::default());
    }

    #[test]
    fn null_status_row_still_counts_toward_totals() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        let mine = store.seed("companies", json!({ "user_id": me, "name": "Mine" }));
        store.seed("invoices", json!({ "company_id": mine["id"], "total": 100, "status": "paid" }));
        store.seed("invoices", json!({ "company_id": mine["id"], "total": 50, "status": null }));

        let stats = fetch_dashboard(&store, me).unwrap();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.pending_invoices, 0);
        assert_eq!(stats.total_revenue, 100.0);
    }

    #[test]
    fn fetch_scopes_to_own_companies() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        let mine = store.seed("companies", json!({ "user_id": me, "name": "Mine" }));
        let theirs = store.seed("companies", json!({ "user_id": Uuid::new_v4(), "name": "Theirs" }));

        store.seed("invoices", json!({ "company_id": mine["id"], "total": 100, "status": "paid" }));
        store.seed("invoices", json!({ "company_id": mine["id"], "total": 50, "status": "pending" }));
        store.seed("invoices", json!({ "company_id": theirs["id"], "total": 999, "status": "paid" }));
        store.seed("clients", json!({ "company_id": mine["id"], "name": "A" }));
        store.seed("clients", json!({ "company_id": theirs["id"], "name": "B" }));

        let stats = fetch_dashboard(&store, me).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_invoices: 2,
                pending_invoices: 1,
                total_revenue: 100.0,
                active_clients: 1,
            }
        );
    }

    #[test]
    fn no_companies_skips_invoice_queries() {
        let store = MemoryStore::new();
        let stats = fetch_dashboard(&store, Uuid::new_v4()).unwrap();
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(store.log(), vec!["select:companies".to_string()]);
    }
}
