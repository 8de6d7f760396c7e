use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_or_empty;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Client {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub tax_id: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub email: String,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub tax_id: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}
