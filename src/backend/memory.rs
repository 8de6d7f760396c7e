use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{DataStore, Filter, Query};
use crate::error::{InvoiceError, Result};

/// In-memory stand-in for the hosted store. Understands `*`, plain columns
/// and to-one embeds written as `alias:table(cols)` (joined on `<alias>_id`).
#[derive(Default)]
pub struct MemoryStore {
    tables: RefCell<HashMap<String, Vec<Value>>>,
    failing: RefCell<HashSet<String>>,
    log: RefCell<Vec<String>>,
    seq: RefCell<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later operation touching `table` fails with a backend error.
    pub fn fail_table(&self, table: &str) {
        self.failing.borrow_mut().insert(table.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .borrow()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Operations in call order, as `op:table`.
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn seed(&self, table: &str, row: Value) -> Value {
        self.insert(table, vec![row])
            .map(|mut rows| rows.remove(0))
            .unwrap_or(Value::Null)
    }

    fn record(&self, op: &str, table: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("{op}:{table}"));
        if self.failing.borrow().contains(table) {
            return Err(InvoiceError::Backend {
                status: 500,
                message: format!("{table} unavailable"),
            });
        }
        Ok(())
    }

    fn matches(row: &Value, filters: &[Filter]) -> bool {
        filters.iter().all(|filter| match filter {
            Filter::Eq(column, value) => text(&row[column]) == *value,
            Filter::In(column, values) => values.contains(&text(&row[column])),
        })
    }

    fn project(&self, row: &Value, columns: &str) -> Value {
        let mut out = Map::new();
        for column in split_columns(columns) {
            if column == "*" {
                if let Some(fields) = row.as_object() {
                    out.extend(fields.clone());
                }
            } else if let Some((alias, rest)) = column.split_once(':') {
                let (table, inner) = rest
                    .trim_end_matches(')')
                    .split_once('(')
                    .unwrap_or((rest, "*"));
                let key = text(&row[format!("{alias}_id")]);
                let embedded = self
                    .rows(table)
                    .into_iter()
                    .find(|r| text(&r["id"]) == key)
                    .map(|r| self.project(&r, inner))
                    .unwrap_or(Value::Null);
                out.insert(alias.to_string(), embedded);
            } else {
                out.insert(column.to_string(), row[column].clone());
            }
        }
        Value::Object(out)
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn split_columns(columns: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in columns.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(columns[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(columns[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

impl DataStore for MemoryStore {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.record("select", &query.table)?;
        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| Self::matches(row, &query.filters))
            .collect();
        if let Some((column, ascending)) = &query.order {
            rows.sort_by_key(|row| text(&row[column]));
            if !ascending {
                rows.reverse();
            }
        }
        Ok(rows
            .iter()
            .map(|row| self.project(row, &query.columns))
            .collect())
    }

    fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        self.record("insert", table)?;
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let seq = {
                let mut seq = self.seq.borrow_mut();
                *seq += 1;
                *seq
            };
            if let Some(fields) = row.as_object_mut() {
                fields
                    .entry("id")
                    .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                fields.entry("created_at").or_insert_with(|| {
                    Value::String(format!("2026-01-01T{:02}:{:02}:{:02}Z", seq / 3600, seq / 60 % 60, seq % 60))
                });
            }
            stored.push(row);
        }
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    fn update(&self, query: &Query, patch: Value) -> Result<()> {
        self.record("update", &query.table)?;
        let mut tables = self.tables.borrow_mut();
        for row in tables.entry(query.table.clone()).or_default() {
            if !Self::matches(row, &query.filters) {
                continue;
            }
            if let (Some(fields), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                fields.extend(changes.clone());
            }
        }
        Ok(())
    }

    fn delete(&self, query: &Query) -> Result<()> {
        self.record("delete", &query.table)?;
        self.tables
            .borrow_mut()
            .entry(query.table.clone())
            .or_default()
            .retain(|row| !Self::matches(row, &query.filters));
        Ok(())
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.record("count", &query.table)?;
        Ok(self
            .rows(&query.table)
            .iter()
            .filter(|row| Self::matches(row, &query.filters))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embeds_to_one_relation_by_alias() {
        let store = MemoryStore::new();
        let company = store.seed("companies", json!({ "name": "Acme" }));
        store.seed("invoices", json!({ "company_id": company["id"], "number": "INV-1" }));

        let rows = store
            .select(&Query::table("invoices").select("*, company:companies(name)"))
            .unwrap();
        assert_eq!(rows[0]["company"], json!({ "name": "Acme" }));
        assert_eq!(rows[0]["number"], json!("INV-1"));
    }

    #[test]
    fn split_columns_respects_parentheses() {
        assert_eq!(
            split_columns("id, total, invoice_items(total, id), status"),
            vec!["id", "total", "invoice_items(total, id)", "status"]
        );
    }
}
