use super::rows::{CachedAlertRow, CachedPetRow, QueuedActionRow};
use crate::domain::entities::{MissingPetAlert, Pet, QueuedAction};
use crate::domain::value_objects::{ActionId, ActionStatus, ActionType, EntityId, OfflinePayload};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::convert::TryInto;

pub fn queued_action_from_row(row: QueuedActionRow) -> Result<QueuedAction, AppError> {
    let id = ActionId::new(row.action_id).map_err(AppError::Storage)?;
    let data = OfflinePayload::from_json_str(&row.payload).map_err(|err| {
        AppError::Storage(format!("queued action {id} has unreadable payload: {err}"))
    })?;
    let local_entity_id = row
        .local_entity_id
        .map(|value| EntityId::new(value).map_err(AppError::Storage))
        .transpose()?;
    let retry_count: u32 = row
        .retry_count
        .try_into()
        .map_err(|_| AppError::Storage(format!("queued action {id} has invalid retry_count")))?;

    Ok(QueuedAction {
        id,
        action_type: ActionType::from(row.action_type.as_str()),
        data,
        local_entity_id,
        created_at: millis_to_datetime(row.created_at),
        updated_at: millis_to_datetime(row.updated_at),
        status: ActionStatus::from(row.status.as_str()),
        retry_count,
        error_message: row.error_message,
    })
}

pub fn pet_from_row(row: CachedPetRow) -> Result<Pet, AppError> {
    serde_json::from_str(&row.data)
        .map_err(|err| AppError::Storage(format!("cached pet {} is corrupt: {err}", row.id)))
}

pub fn alert_from_row(row: CachedAlertRow) -> Result<MissingPetAlert, AppError> {
    serde_json::from_str(&row.data)
        .map_err(|err| AppError::Storage(format!("cached alert {} is corrupt: {err}", row.id)))
}

pub fn entity_json<T: serde::Serialize>(entity: &T) -> Result<String, AppError> {
    serde_json::to_string(entity).map_err(|err| AppError::SerializationError(err.to_string()))
}

pub fn millis_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(payload: &str, retry_count: i64) -> QueuedActionRow {
        QueuedActionRow {
            seq: 1,
            action_id: "a-1".to_string(),
            action_type: "markPetFound".to_string(),
            payload: payload.to_string(),
            local_entity_id: None,
            status: "failed".to_string(),
            retry_count,
            error_message: Some("boom".to_string()),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_500,
        }
    }

    #[test]
    fn maps_row_fields() {
        let action = queued_action_from_row(row(r#"{"petId":"pet-1"}"#, 2)).unwrap();
        assert_eq!(action.action_type, ActionType::MarkPetFound);
        assert_eq!(action.status, ActionStatus::Failed);
        assert_eq!(action.retry_count, 2);
        assert_eq!(action.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn corrupt_payload_is_a_storage_error() {
        let err = queued_action_from_row(row("{not json", 0)).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn negative_retry_count_is_rejected() {
        assert!(queued_action_from_row(row(r#"{"petId":"pet-1"}"#, -1)).is_err());
    }
}
