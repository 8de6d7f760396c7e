use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_or_empty;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub tax_id: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub email: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Insert payload for the `companies` table. The owner is stamped by the caller.
#[derive(Debug, Serialize, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}
