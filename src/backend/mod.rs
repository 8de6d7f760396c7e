//! Remote collaborators: the hosted data store and the hosted auth service.
//!
//! Everything persistent lives behind these two traits. The REST
//! implementations speak the PostgREST and GoTrue HTTP dialects; tests use an
//! in-memory store.

mod auth;
#[cfg(test)]
pub(crate) mod memory;
mod rest;

pub use auth::{AuthProvider, GoTrueAuth, Session, User};
pub use rest::RestStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// Row filter. Only the predicates the screens actually use are modelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

/// A table-scoped query: column list (nested selects allowed), filters, ordering.
#[derive(Debug, Clone)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<(String, bool)>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }
}

/// Table-scoped CRUD over the hosted database. Access control is the store's job.
pub trait DataStore {
    fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Insert rows and return them as stored (ids and defaults filled in).
    fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    fn update(&self, query: &Query, patch: Value) -> Result<()>;

    fn delete(&self, query: &Query) -> Result<()>;

    fn count(&self, query: &Query) -> Result<u64>;
}

pub fn select_as<T, S>(store: &S, query: &Query) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: DataStore + ?Sized,
{
    store
        .select(query)?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

pub fn insert_as<P, T, S>(store: &S, table: &str, rows: &[P]) -> Result<Vec<T>>
where
    P: Serialize,
    T: DeserializeOwned,
    S: DataStore + ?Sized,
{
    let rows = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    store
        .insert(table, rows)?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}
