use std::fs;
use std::path::Path;

use super::{read_toml, write_toml};
use crate::backend::Session;
use crate::error::Result;

const SESSION_FILE: &str = "session.toml";

/// Load the stored session, if any.
pub fn load_session(config_dir: &Path) -> Result<Option<Session>> {
    let path = config_dir.join(SESSION_FILE);
    if !path.exists() {
        return Ok(None);
    }
    read_toml(path).map(Some)
}

pub fn save_session(config_dir: &Path, session: &Session) -> Result<()> {
    write_toml(config_dir.join(SESSION_FILE), session)
}

pub fn clear_session(config_dir: &Path) -> Result<()> {
    let path = config_dir.join(SESSION_FILE);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
