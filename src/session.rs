//! Session and onboarding gate.
//!
//! `Unauthenticated -> NoCompany -> HasCompany`. The company check runs once
//! per auth state change and is not kept live; after onboarding creates a
//! company the caller re-runs the gate to pick it up.

use chrono::Utc;
use std::path::Path;
use tracing::{error, info, warn};

use crate::backend::{AuthProvider, DataStore, Query, Session};
use crate::companies;
use crate::config::{clear_session, load_session, save_session};
use crate::error::{InvoiceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    NoCompany,
    HasCompany,
}

#[derive(Debug)]
pub struct SessionGate {
    state: GateState,
    session: Option<Session>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Unauthenticated,
            session: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Handle an auth state change. A failed company lookup is logged and
    /// treated as "no company yet".
    pub fn on_auth_state_change<S: DataStore + ?Sized>(
        &mut self,
        session: Option<Session>,
        store: &S,
    ) -> GateState {
        self.state = match &session {
            None => GateState::Unauthenticated,
            Some(s) => match has_company(store, s) {
                Ok(true) => GateState::HasCompany,
                Ok(false) => GateState::NoCompany,
                Err(e) => {
                    error!(error = %e, "error checking company");
                    GateState::NoCompany
                }
            },
        };
        self.session = session;
        info!(state = ?self.state, "auth state changed");
        self.state
    }

    /// Session for commands that only need a signed-in user.
    pub fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(InvoiceError::NotSignedIn)
    }

    /// Session for commands that need onboarding to be complete.
    pub fn require_company(&self) -> Result<&Session> {
        match self.state {
            GateState::Unauthenticated => Err(InvoiceError::NotSignedIn),
            GateState::NoCompany => Err(InvoiceError::OnboardingRequired),
            GateState::HasCompany => self.require_session(),
        }
    }
}

fn has_company<S: DataStore + ?Sized>(store: &S, session: &Session) -> Result<bool> {
    let rows = store.select(
        &Query::table(companies::TABLE)
            .select("id")
            .eq("user_id", session.user.id),
    )?;
    Ok(!rows.is_empty())
}

/// Retrieve the stored session, refreshing it when the access token has
/// expired. A refresh the auth service rejects signs the user out locally.
pub fn restore_session<A: AuthProvider + ?Sized>(
    config_dir: &Path,
    auth: &A,
) -> Result<Option<Session>> {
    let Some(session) = load_session(config_dir)? else {
        return Ok(None);
    };
    if !session.is_expired(Utc::now().timestamp()) {
        return Ok(Some(session));
    }

    match auth.refresh(&session) {
        Ok(fresh) => {
            save_session(config_dir, &fresh)?;
            Ok(Some(fresh))
        }
        Err(InvoiceError::Auth(message)) => {
            warn!(%message, "stored session could not be refreshed");
            clear_session(config_dir)?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
