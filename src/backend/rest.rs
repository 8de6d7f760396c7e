use serde_json::Value;
use tracing::{debug, error};
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use super::{DataStore, Filter, Query};
use crate::config::BackendConfig;
use crate::error::{InvoiceError, Result};

/// Agent shared by the data and auth clients. Non-2xx answers are returned as
/// responses so the backend's own error message can be surfaced. No timeout is
/// configured; the transport's defaults apply.
pub(crate) fn agent() -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into()
}

/// Read a response body, turning non-2xx statuses into `InvoiceError::Backend`.
pub(crate) fn read_body(mut response: Response<Body>) -> Result<String> {
    let status = response.status();
    let body = response.body_mut().read_to_string()?;
    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body);
    error!(status = status.as_u16(), %message, "backend request failed");
    Err(InvoiceError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// PostgREST says `message`, GoTrue says `msg` or `error_description`.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| json[*key].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Parse the total out of a `Content-Range` header (`0-9/42`, `*/0`).
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

/// PostgREST client for the `/rest/v1` endpoint.
pub struct RestStore {
    agent: Agent,
    base_url: String,
    anon_key: String,
    bearer: String,
}

impl RestStore {
    /// Without an access token the anon key doubles as the bearer, which the
    /// row-level policies treat as an anonymous caller.
    pub fn new(backend: &BackendConfig, access_token: Option<&str>) -> Self {
        Self {
            agent: agent(),
            base_url: format!("{}/rest/v1", backend.url.trim_end_matches('/')),
            anon_key: backend.anon_key.clone(),
            bearer: access_token.unwrap_or(&backend.anon_key).to_string(),
        }
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {}", self.bearer))
    }

    fn with_params<B>(request: RequestBuilder<B>, params: Vec<(String, String)>) -> RequestBuilder<B> {
        params
            .into_iter()
            .fold(request, |request, (key, value)| request.query(key, value))
    }
}

/// Row filters as PostgREST query parameters: `col=eq.v`, `col=in.(a,b)`.
fn filter_params(query: &Query) -> Vec<(String, String)> {
    query
        .filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{value}")),
            Filter::In(column, values) => (column.clone(), format!("in.({})", values.join(","))),
        })
        .collect()
}

/// Parameters of a read: `select=`, the filters, then `order=col.asc|desc`.
fn read_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];
    params.extend(filter_params(query));
    if let Some((column, ascending)) = &query.order {
        let direction = if *ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{column}.{direction}")));
    }
    params
}

impl DataStore for RestStore {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        debug!(table = %query.table, columns = %query.columns, "select");
        let request = Self::with_params(
            self.authorize(self.agent.get(&self.url(&query.table))),
            read_params(query),
        );

        let body = read_body(request.call()?)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        debug!(%table, rows = rows.len(), "insert");
        let request = self
            .authorize(self.agent.post(&self.url(table)))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation");

        let body = read_body(request.send(serde_json::to_string(&rows)?)?)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn update(&self, query: &Query, patch: Value) -> Result<()> {
        debug!(table = %query.table, "update");
        let request = self
            .authorize(self.agent.patch(&self.url(&query.table)))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal");
        let request = Self::with_params(request, filter_params(query));

        read_body(request.send(serde_json::to_string(&patch)?)?)?;
        Ok(())
    }

    fn delete(&self, query: &Query) -> Result<()> {
        debug!(table = %query.table, "delete");
        let request = self.authorize(self.agent.delete(&self.url(&query.table)));
        let request = Self::with_params(request, filter_params(query));

        read_body(request.call()?)?;
        Ok(())
    }

    fn count(&self, query: &Query) -> Result<u64> {
        debug!(table = %query.table, "count");
        let request = self
            .authorize(self.agent.get(&self.url(&query.table)))
            .header("Prefer", "count=exact")
            .query("limit", "1");
        let request = Self::with_params(request, read_params(query));

        let response = request.call()?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);
        read_body(response)?;

        total.ok_or_else(|| InvoiceError::Backend {
            status: 200,
            message: "count response carried no Content-Range header".to_string(),
        })
    }
}
