use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::backend::{insert_as, select_as, DataStore, Query};
use crate::error::{InvoiceError, Result};
use crate::model::{Client, NewClient};
use crate::validate;

pub const TABLE: &str = "clients";

#[derive(Serialize)]
struct CompanyClient<'a> {
    company_id: Uuid,
    #[serde(flatten)]
    client: &'a NewClient,
}

/// Clients belonging to any of `company_ids`. No companies, no query.
pub fn list_clients<S: DataStore + ?Sized>(store: &S, company_ids: &[Uuid]) -> Result<Vec<Client>> {
    if company_ids.is_empty() {
        return Ok(Vec::new());
    }
    select_as(
        store,
        &Query::table(TABLE)
            .in_list("company_id", company_ids)
            .order("name", true),
    )
}

pub fn count_clients<S: DataStore + ?Sized>(store: &S, company_ids: &[Uuid]) -> Result<u64> {
    if company_ids.is_empty() {
        return Ok(0);
    }
    store.count(&Query::table(TABLE).select("id").in_list("company_id", company_ids))
}

pub fn get_client<S: DataStore + ?Sized>(store: &S, id: Uuid) -> Result<Client> {
    select_as::<Client, _>(store, &Query::table(TABLE).eq("id", id))?
        .pop()
        .ok_or_else(|| InvoiceError::ClientNotFound(id.to_string()))
}

pub fn create_client<S: DataStore + ?Sized>(
    store: &S,
    company_id: Uuid,
    client: &NewClient,
) -> Result<Client> {
    let client = NewClient {
        name: validate::required("Client name", &client.name)?.to_string(),
        email: validate::optional_email(&client.email)?.to_string(),
        ..client.clone()
    };

    let mut created: Vec<Client> = insert_as(
        store,
        TABLE,
        &[CompanyClient {
            company_id,
            client: &client,
        }],
    )?;
    let created = created
        .pop()
        .ok_or_else(|| InvoiceError::ClientNotFound(client.name.clone()))?;
    info!(client = %created.id, company = %company_id, "client created");
    Ok(created)
}

/// Pick a client of the given company by id or (case-insensitive) name.
pub fn find_client<'a>(clients: &'a [Client], company_id: Uuid, reference: &str) -> Result<&'a Client> {
    clients
        .iter()
        .filter(|c| c.company_id == company_id)
        .find(|c| c.id.to_string() == reference || c.name.eq_ignore_ascii_case(reference))
        .ok_or_else(|| InvoiceError::ClientNotFound(reference.to_string()))
}
