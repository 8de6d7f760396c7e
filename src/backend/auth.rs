use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use ureq::Agent;
use uuid::Uuid;

use super::rest::{agent, read_body};
use crate::config::BackendConfig;
use crate::error::{InvoiceError, Result};

/// Seconds before the recorded expiry at which a token is already treated as stale.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Signed-in session as handed out by the auth service.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }

    /// Build a session from a token grant response. Returns `None` when the
    /// body carries no access token (sign-up awaiting email confirmation).
    pub fn from_grant(body: &Value, now: i64) -> Result<Option<Session>> {
        let Some(access_token) = body["access_token"].as_str() else {
            return Ok(None);
        };
        let expires_at = body["expires_at"]
            .as_i64()
            .or_else(|| body["expires_in"].as_i64().map(|secs| now + secs))
            .unwrap_or(now);
        let user: User = serde_json::from_value(body["user"].clone())?;

        Ok(Some(Session {
            access_token: access_token.to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap_or_default().to_string(),
            expires_at,
            user,
        }))
    }
}

/// The managed auth collaborator.
pub trait AuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// `None` when the provider requires the address to be confirmed first.
    fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>>;

    fn sign_out(&self, session: &Session) -> Result<()>;

    fn refresh(&self, session: &Session) -> Result<Session>;
}

/// GoTrue client for the `/auth/v1` endpoint.
pub struct GoTrueAuth {
    agent: Agent,
    base_url: String,
    anon_key: String,
}

impl GoTrueAuth {
    pub fn new(backend: &BackendConfig) -> Self {
        Self {
            agent: agent(),
            base_url: format!("{}/auth/v1", backend.url.trim_end_matches('/')),
            anon_key: backend.anon_key.clone(),
        }
    }

    fn post(&self, path: &str, bearer: Option<&str>, payload: Value) -> Result<Value> {
        debug!(%path, "auth request");
        let bearer = bearer.unwrap_or(&self.anon_key);
        let response = self
            .agent
            .post(&format!("{}/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {bearer}"))
            .header("Content-Type", "application/json")
            .send(payload.to_string())?;

        let body = read_body(response)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn grant(&self, grant_type: &str, payload: Value) -> Result<Session> {
        let body = self
            .post(&format!("token?grant_type={grant_type}"), None, payload)
            .map_err(into_auth_error)?;
        Session::from_grant(&body, Utc::now().timestamp())?
            .ok_or_else(|| InvoiceError::Auth("no session in token response".to_string()))
    }
}

/// Auth-side backend failures are reported as authentication errors.
fn into_auth_error(err: InvoiceError) -> InvoiceError {
    match err {
        InvoiceError::Backend { message, .. } => InvoiceError::Auth(message),
        other => other,
    }
}

impl AuthProvider for GoTrueAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.grant("password", json!({ "email": email, "password": password }))?;
        info!(user = %session.user.id, "signed in");
        Ok(session)
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let body = self
            .post("signup", None, json!({ "email": email, "password": password }))
            .map_err(into_auth_error)?;
        let session = Session::from_grant(&body, Utc::now().timestamp())?;
        info!(confirmed = session.is_some(), "signed up");
        Ok(session)
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        self.post("logout", Some(&session.access_token), json!({}))
            .map_err(into_auth_error)?;
        info!(user = %session.user.id, "signed out");
        Ok(())
    }

    fn refresh(&self, session: &Session) -> Result<Session> {
        self.grant(
            "refresh_token",
            json!({ "refresh_token": session.refresh_token }),
        )
    }
}
