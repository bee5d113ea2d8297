use super::action_payload::ActionPayload;
use crate::domain::value_objects::{ActionId, ActionStatus, ActionType, EntityId, OfflinePayload};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user action recorded while offline, waiting to be replayed against the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedAction {
    pub id: ActionId,
    pub action_type: ActionType,
    pub data: OfflinePayload,
    /// Placeholder id of the optimistic record this action created, if any.
    pub local_entity_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ActionStatus,
    pub retry_count: u32,
    pub error_message: Option<String>,
}

impl QueuedAction {
    pub fn payload(&self) -> Result<ActionPayload, AppError> {
        ActionPayload::decode(&self.action_type, &self.data)
    }

    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }

    pub fn description(&self) -> String {
        self.action_type.description()
    }
}

/// Everything needed to persist a new queued action.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedActionDraft {
    pub action_type: ActionType,
    pub data: OfflinePayload,
    pub local_entity_id: Option<EntityId>,
}

impl QueuedActionDraft {
    pub fn from_payload(
        payload: &ActionPayload,
        local_entity_id: Option<EntityId>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            action_type: payload.action_type(),
            data: payload.to_data()?,
            local_entity_id,
        })
    }
}
