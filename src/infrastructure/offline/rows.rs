use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueuedActionRow {
    pub seq: i64,
    pub action_id: String,
    pub action_type: String,
    pub payload: String,
    pub local_entity_id: Option<String>,
    pub status: String,
    pub retry_count: i64,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CachedPetRow {
    pub id: String,
    pub data: String,
    pub is_optimistic: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CachedAlertRow {
    pub id: String,
    pub pet_id: String,
    pub status: String,
    pub data: String,
    pub is_optimistic: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
