use super::mappers::{
    alert_from_row, entity_json, millis_to_datetime, pet_from_row, queued_action_from_row,
};
use super::rows::{CachedAlertRow, CachedPetRow, QueuedActionRow};
use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{
    CacheWrite, CachedEntity, MissingPetAlert, Pet, QueuedAction, QueuedActionDraft,
};
use crate::domain::value_objects::{ActionId, ActionStatus, EntityId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqliteConnection};

const LAST_SUCCESSFUL_SYNC_KEY: &str = "last_successful_sync";

const SELECT_ACTIONS: &str = r#"
    SELECT seq, action_id, action_type, payload, local_entity_id, status,
           retry_count, error_message, created_at, updated_at
    FROM queued_actions
"#;

/// SQLite-backed queue and entity cache.
pub struct SqliteOfflineStore {
    pool: Pool<Sqlite>,
}

impl SqliteOfflineStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

async fn insert_action(
    conn: &mut SqliteConnection,
    draft: QueuedActionDraft,
) -> Result<QueuedAction, AppError> {
    let id = ActionId::generate();
    let now = Utc::now().timestamp_millis();
    let payload = serde_json::to_string(draft.data.as_json())
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO queued_actions (
            action_id, action_type, payload, local_entity_id,
            status, retry_count, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
        "#,
    )
    .bind(id.as_str())
    .bind(draft.action_type.as_str())
    .bind(&payload)
    .bind(draft.local_entity_id.as_ref().map(EntityId::as_str))
    .bind(ActionStatus::Pending.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        target: "offline::store",
        action_id = %id,
        action_type = %draft.action_type,
        "queued offline action"
    );

    Ok(QueuedAction {
        id,
        action_type: draft.action_type,
        data: draft.data,
        local_entity_id: draft.local_entity_id,
        created_at: millis_to_datetime(now),
        updated_at: millis_to_datetime(now),
        status: ActionStatus::Pending,
        retry_count: 0,
        error_message: None,
    })
}

async fn upsert_pet(
    conn: &mut SqliteConnection,
    pet: &Pet,
    optimistic: bool,
    now: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO cached_pets (id, data, is_optimistic, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            is_optimistic = excluded.is_optimistic,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(pet.id.as_str())
    .bind(entity_json(pet)?)
    .bind(optimistic)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_alert(
    conn: &mut SqliteConnection,
    alert: &MissingPetAlert,
    optimistic: bool,
    now: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO cached_alerts (id, pet_id, status, data, is_optimistic, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            pet_id = excluded.pet_id,
            status = excluded.status,
            data = excluded.data,
            is_optimistic = excluded.is_optimistic,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(alert.id.as_str())
    .bind(alert.pet_id.as_str())
    .bind(alert.status.as_str())
    .bind(entity_json(alert)?)
    .bind(optimistic)
    .bind(alert.created_at.timestamp_millis())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_cached(
    conn: &mut SqliteConnection,
    entity: &CachedEntity,
    optimistic: bool,
    now: i64,
) -> Result<(), AppError> {
    match entity {
        CachedEntity::Pet(pet) => upsert_pet(conn, pet, optimistic, now).await,
        CachedEntity::Alert(alert) => upsert_alert(conn, alert, optimistic, now).await,
    }
}

async fn apply_write(conn: &mut SqliteConnection, write: &CacheWrite) -> Result<(), AppError> {
    let now = Utc::now().timestamp_millis();
    match write {
        CacheWrite::Upsert { entity, optimistic } => {
            upsert_cached(conn, entity, *optimistic, now).await
        }
        CacheWrite::Replace { old_id, entity } => {
            if old_id != entity.id() {
                let sql = match entity {
                    CachedEntity::Pet(_) => "DELETE FROM cached_pets WHERE id = ?1",
                    CachedEntity::Alert(_) => "DELETE FROM cached_alerts WHERE id = ?1",
                };
                sqlx::query(sql)
                    .bind(old_id.as_str())
                    .execute(&mut *conn)
                    .await?;
            }
            upsert_cached(conn, entity, false, now).await?;
            tracing::debug!(
                target: "offline::store",
                kind = entity.kind(),
                old_id = %old_id,
                new_id = %entity.id(),
                "replaced cached entity"
            );
            Ok(())
        }
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn fetch_pending_actions(&self) -> Result<Vec<QueuedAction>, AppError> {
        let rows = sqlx::query_as::<_, QueuedActionRow>(&format!(
            "{SELECT_ACTIONS} ORDER BY created_at ASC, seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(queued_action_from_row).collect()
    }

    async fn fetch_action(&self, id: &ActionId) -> Result<Option<QueuedAction>, AppError> {
        let row = sqlx::query_as::<_, QueuedActionRow>(&format!(
            "{SELECT_ACTIONS} WHERE action_id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(queued_action_from_row).transpose()
    }

    async fn enqueue_action(&self, draft: QueuedActionDraft) -> Result<QueuedAction, AppError> {
        let mut tx = self.pool.begin().await?;
        let action = insert_action(&mut tx, draft).await?;
        tx.commit().await?;
        Ok(action)
    }

    async fn enqueue_with_optimistic(
        &self,
        draft: QueuedActionDraft,
        writes: Vec<CacheWrite>,
    ) -> Result<QueuedAction, AppError> {
        let mut tx = self.pool.begin().await?;
        for write in &writes {
            apply_write(&mut tx, write).await?;
        }
        let action = insert_action(&mut tx, draft).await?;
        tx.commit().await?;
        Ok(action)
    }

    async fn delete_action(&self, id: &ActionId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM queued_actions WHERE action_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_action_failed(
        &self,
        id: &ActionId,
        error_message: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE queued_actions
            SET retry_count = retry_count + 1,
                status = ?1,
                error_message = ?2,
                updated_at = ?3
            WHERE action_id = ?4
            "#,
        )
        .bind(ActionStatus::Failed.as_str())
        .bind(error_message)
        .bind(Utc::now().timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("queued action {id}")));
        }
        Ok(())
    }

    async fn complete_action(
        &self,
        id: &ActionId,
        writes: Vec<CacheWrite>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM queued_actions WHERE action_id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        for write in &writes {
            apply_write(&mut tx, write).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn pending_actions_count(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM queued_actions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn failed_actions_count(&self) -> Result<u64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queued_actions WHERE status = ?1")
                .bind(ActionStatus::Failed.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_pets(&self) -> Result<Vec<Pet>, AppError> {
        let rows = sqlx::query_as::<_, CachedPetRow>(
            "SELECT id, data, is_optimistic, updated_at FROM cached_pets ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(pet_from_row).collect()
    }

    async fn fetch_alerts(&self) -> Result<Vec<MissingPetAlert>, AppError> {
        let rows = sqlx::query_as::<_, CachedAlertRow>(
            r#"
            SELECT id, pet_id, status, data, is_optimistic, created_at, updated_at
            FROM cached_alerts
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(alert_from_row).collect()
    }

    async fn fetch_pet(&self, id: &EntityId) -> Result<Option<Pet>, AppError> {
        let row = sqlx::query_as::<_, CachedPetRow>(
            "SELECT id, data, is_optimistic, updated_at FROM cached_pets WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(pet_from_row).transpose()
    }

    async fn fetch_alert(&self, id: &EntityId) -> Result<Option<MissingPetAlert>, AppError> {
        let row = sqlx::query_as::<_, CachedAlertRow>(
            r#"
            SELECT id, pet_id, status, data, is_optimistic, created_at, updated_at
            FROM cached_alerts
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(alert_from_row).transpose()
    }

    async fn upsert_entity(&self, entity: CachedEntity) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        apply_write(&mut conn, &CacheWrite::canonical(entity)).await
    }

    async fn replace_entity(
        &self,
        old_id: &EntityId,
        entity: CachedEntity,
    ) -> Result<(), AppError> {
        self.apply_cache_writes(vec![CacheWrite::Replace {
            old_id: old_id.clone(),
            entity,
        }])
        .await
    }

    async fn apply_cache_writes(&self, writes: Vec<CacheWrite>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for write in &writes {
            apply_write(&mut tx, write).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_sync_completed(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(LAST_SUCCESSFUL_SYNC_KEY)
        .bind(at.timestamp_millis().to_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_successful_sync(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM sync_state WHERE key = ?1")
            .bind(LAST_SUCCESSFUL_SYNC_KEY)
            .fetch_optional(&self.pool)
            .await?;

        value
            .map(|(raw,)| {
                raw.parse::<i64>()
                    .map(millis_to_datetime)
                    .map_err(|err| AppError::Storage(format!("invalid last sync marker: {err}")))
            })
            .transpose()
    }
}
