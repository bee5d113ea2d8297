use crate::domain::entities::{
    CacheWrite, CachedEntity, MissingPetAlert, Pet, QueuedAction, QueuedActionDraft,
};
use crate::domain::value_objects::{ActionId, EntityId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable local store for the action queue and the offline entity cache.
///
/// Every method is a single transaction.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// All queued actions, oldest first.
    async fn fetch_pending_actions(&self) -> Result<Vec<QueuedAction>, AppError>;
    async fn fetch_action(&self, id: &ActionId) -> Result<Option<QueuedAction>, AppError>;
    async fn enqueue_action(&self, draft: QueuedActionDraft) -> Result<QueuedAction, AppError>;
    /// Writes optimistic cache records and the queued action together.
    async fn enqueue_with_optimistic(
        &self,
        draft: QueuedActionDraft,
        writes: Vec<CacheWrite>,
    ) -> Result<QueuedAction, AppError>;
    /// Idempotent.
    async fn delete_action(&self, id: &ActionId) -> Result<(), AppError>;
    async fn mark_action_failed(&self, id: &ActionId, error_message: &str)
        -> Result<(), AppError>;
    /// Deletes the action and applies its reconciliation writes together.
    async fn complete_action(&self, id: &ActionId, writes: Vec<CacheWrite>)
        -> Result<(), AppError>;
    async fn pending_actions_count(&self) -> Result<u64, AppError>;
    async fn failed_actions_count(&self) -> Result<u64, AppError>;

    async fn fetch_pets(&self) -> Result<Vec<Pet>, AppError>;
    async fn fetch_alerts(&self) -> Result<Vec<MissingPetAlert>, AppError>;
    async fn fetch_pet(&self, id: &EntityId) -> Result<Option<Pet>, AppError>;
    async fn fetch_alert(&self, id: &EntityId) -> Result<Option<MissingPetAlert>, AppError>;
    async fn upsert_entity(&self, entity: CachedEntity) -> Result<(), AppError>;
    /// Removes `old_id` and stores `entity` atomically.
    async fn replace_entity(&self, old_id: &EntityId, entity: CachedEntity)
        -> Result<(), AppError>;
    async fn apply_cache_writes(&self, writes: Vec<CacheWrite>) -> Result<(), AppError>;

    async fn record_sync_completed(&self, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn last_successful_sync(&self) -> Result<Option<DateTime<Utc>>, AppError>;
}
