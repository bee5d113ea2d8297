use super::action_executor::ActionExecutor;
use super::reconciliation::reconcile;
use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{
    ActionPayload, AlertStatus, CacheWrite, CachedEntity, CanonicalEntity, CreateAlertData,
    MarkPetFoundData, MarkPetLostData, MissingPetAlert, Pet, QueuedAction, QueuedActionDraft,
    ReportSightingData, Sighting, UpdateAlertData, UpdatePetData,
};
use crate::domain::value_objects::{ActionId, EntityId};
use crate::infrastructure::network::ReachabilityMonitor;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// What happened to a user action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionDisposition {
    /// The server accepted it; the canonical entities are already cached.
    Completed(Vec<CanonicalEntity>),
    /// Stored for later replay. The cache shows the optimistic result.
    QueuedOffline(QueuedAction),
}

impl ActionDisposition {
    pub fn is_queued(&self) -> bool {
        matches!(self, ActionDisposition::QueuedOffline(_))
    }
}

#[async_trait]
pub trait OfflineServiceTrait: Send + Sync {
    async fn mark_pet_lost(&self, data: MarkPetLostData) -> Result<ActionDisposition, AppError>;
    async fn mark_pet_found(&self, data: MarkPetFoundData)
        -> Result<ActionDisposition, AppError>;
    async fn report_sighting(
        &self,
        data: ReportSightingData,
    ) -> Result<ActionDisposition, AppError>;
    async fn create_alert(&self, data: CreateAlertData) -> Result<ActionDisposition, AppError>;
    async fn update_pet(&self, data: UpdatePetData) -> Result<ActionDisposition, AppError>;
    async fn update_alert(&self, data: UpdateAlertData) -> Result<ActionDisposition, AppError>;

    async fn pending_actions(&self) -> Result<Vec<QueuedAction>, AppError>;
    async fn pending_actions_count(&self) -> Result<u64, AppError>;
    async fn failed_actions_count(&self) -> Result<u64, AppError>;
    async fn time_since_last_sync(&self) -> Result<Option<chrono::Duration>, AppError>;
    async fn actions_needing_attention(&self) -> Result<Vec<QueuedAction>, AppError>;
    async fn remove_action(&self, id: &ActionId) -> Result<(), AppError>;
    async fn cached_pets(&self) -> Result<Vec<Pet>, AppError>;
    async fn cached_alerts(&self) -> Result<Vec<MissingPetAlert>, AppError>;
}

pub struct OfflineService {
    store: Arc<dyn OfflineStore>,
    executor: Arc<dyn ActionExecutor>,
    reachability: Arc<ReachabilityMonitor>,
    attention_retry_threshold: u32,
}

impl OfflineService {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        executor: Arc<dyn ActionExecutor>,
        reachability: Arc<ReachabilityMonitor>,
        attention_retry_threshold: u32,
    ) -> Self {
        Self {
            store,
            executor,
            reachability,
            attention_retry_threshold,
        }
    }

    async fn submit(&self, payload: ActionPayload) -> Result<ActionDisposition, AppError> {
        if self.reachability.is_connected() {
            match self.executor.execute_payload(&payload).await {
                Ok(entities) => {
                    let writes =
                        reconcile(self.store.as_ref(), &payload, None, entities.clone()).await?;
                    self.store.apply_cache_writes(writes).await?;
                    return Ok(ActionDisposition::Completed(entities));
                }
                Err(err) if err.is_connectivity() => {
                    tracing::warn!(
                        target: "offline::sync",
                        action_type = %payload.action_type(),
                        error = %err,
                        "remote call failed, queuing for later"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let local_entity_id = match payload {
            ActionPayload::MarkPetLost(_)
            | ActionPayload::CreateAlert(_)
            | ActionPayload::ReportSighting(_) => Some(EntityId::placeholder()),
            _ => None,
        };
        let writes = self
            .optimistic_writes(&payload, local_entity_id.as_ref())
            .await?;
        let draft = QueuedActionDraft::from_payload(&payload, local_entity_id)?;
        let action = self.store.enqueue_with_optimistic(draft, writes).await?;

        tracing::info!(
            target: "offline::sync",
            action_id = %action.id,
            action_type = %action.action_type,
            "action queued offline"
        );
        Ok(ActionDisposition::QueuedOffline(action))
    }

    async fn pet_or_stub(&self, id: &EntityId) -> Result<Pet, AppError> {
        Ok(self
            .store
            .fetch_pet(id)
            .await?
            .unwrap_or_else(|| Pet::stub(id.clone())))
    }

    async fn optimistic_writes(
        &self,
        payload: &ActionPayload,
        placeholder: Option<&EntityId>,
    ) -> Result<Vec<CacheWrite>, AppError> {
        let now = Utc::now();
        let mut writes = Vec::new();

        match payload {
            ActionPayload::MarkPetLost(data) => {
                let mut pet = self.pet_or_stub(&data.pet_id).await?;
                pet.is_missing = true;
                writes.push(CacheWrite::optimistic(CachedEntity::Pet(pet)));

                if let Some(placeholder) = placeholder {
                    let mut alert =
                        MissingPetAlert::new(placeholder.clone(), data.pet_id.clone(), now);
                    alert.last_seen_location = data.location();
                    alert.description = data.description.clone();
                    alert.reward_amount = data.reward_amount;
                    writes.push(CacheWrite::optimistic(CachedEntity::Alert(alert)));
                }
            }
            ActionPayload::MarkPetFound(data) => {
                if let Some(mut pet) = self.store.fetch_pet(&data.pet_id).await? {
                    pet.is_missing = false;
                    writes.push(CacheWrite::optimistic(CachedEntity::Pet(pet)));
                }
                for mut alert in self.store.fetch_alerts().await? {
                    if alert.pet_id == data.pet_id && alert.is_active() {
                        alert.status = AlertStatus::Found;
                        writes.push(CacheWrite::optimistic(CachedEntity::Alert(alert)));
                    }
                }
            }
            ActionPayload::ReportSighting(data) => {
                match (self.store.fetch_alert(&data.alert_id).await?, placeholder) {
                    (Some(mut alert), Some(placeholder)) => {
                        alert.put_sighting(Sighting {
                            id: placeholder.clone(),
                            alert_id: data.alert_id.clone(),
                            reporter_name: data.reporter_name.clone(),
                            reporter_phone: data.reporter_phone.clone(),
                            location: data.location.clone(),
                            notes: data.notes.clone(),
                            sighted_at: data.sighted_at.unwrap_or(now),
                        });
                        writes.push(CacheWrite::optimistic(CachedEntity::Alert(alert)));
                    }
                    _ => {
                        tracing::debug!(
                            target: "offline::sync",
                            alert_id = %data.alert_id,
                            "sighting for uncached alert, nothing to show"
                        );
                    }
                }
            }
            ActionPayload::CreateAlert(data) => {
                if let Some(placeholder) = placeholder {
                    let mut alert =
                        MissingPetAlert::new(placeholder.clone(), data.pet_id.clone(), now);
                    alert.last_seen_location = data.location.clone();
                    alert.description = data.description.clone();
                    alert.reward_amount = data.reward_amount;
                    alert.alert_radius_km = data.alert_radius_km;
                    writes.push(CacheWrite::optimistic(CachedEntity::Alert(alert)));
                }
                let mut pet = self.pet_or_stub(&data.pet_id).await?;
                pet.is_missing = true;
                writes.push(CacheWrite::optimistic(CachedEntity::Pet(pet)));
            }
            ActionPayload::UpdatePet(data) => {
                if let Some(mut pet) = self.store.fetch_pet(&data.pet_id).await? {
                    pet.apply_changes(&data.changes);
                    writes.push(CacheWrite::optimistic(CachedEntity::Pet(pet)));
                }
            }
            ActionPayload::UpdateAlert(data) => {
                if let Some(mut alert) = self.store.fetch_alert(&data.alert_id).await? {
                    if let Some(description) = &data.description {
                        alert.description = Some(description.clone());
                    }
                    if data.reward_amount.is_some() {
                        alert.reward_amount = data.reward_amount;
                    }
                    if data.alert_radius_km.is_some() {
                        alert.alert_radius_km = data.alert_radius_km;
                    }
                    writes.push(CacheWrite::optimistic(CachedEntity::Alert(alert)));
                }
            }
        }

        Ok(writes)
    }
}

#[async_trait]
impl OfflineServiceTrait for OfflineService {
    async fn mark_pet_lost(&self, data: MarkPetLostData) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::MarkPetLost(data)).await
    }

    async fn mark_pet_found(
        &self,
        data: MarkPetFoundData,
    ) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::MarkPetFound(data)).await
    }

    async fn report_sighting(
        &self,
        data: ReportSightingData,
    ) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::ReportSighting(data)).await
    }

    async fn create_alert(&self, data: CreateAlertData) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::CreateAlert(data)).await
    }

    async fn update_pet(&self, data: UpdatePetData) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::UpdatePet(data)).await
    }

    async fn update_alert(&self, data: UpdateAlertData) -> Result<ActionDisposition, AppError> {
        self.submit(ActionPayload::UpdateAlert(data)).await
    }

    async fn pending_actions(&self) -> Result<Vec<QueuedAction>, AppError> {
        self.store.fetch_pending_actions().await
    }

    async fn pending_actions_count(&self) -> Result<u64, AppError> {
        self.store.pending_actions_count().await
    }

    async fn failed_actions_count(&self) -> Result<u64, AppError> {
        self.store.failed_actions_count().await
    }

    async fn time_since_last_sync(&self) -> Result<Option<chrono::Duration>, AppError> {
        Ok(self
            .store
            .last_successful_sync()
            .await?
            .map(|at| Utc::now() - at))
    }

    async fn actions_needing_attention(&self) -> Result<Vec<QueuedAction>, AppError> {
        let threshold = self.attention_retry_threshold;
        Ok(self
            .store
            .fetch_pending_actions()
            .await?
            .into_iter()
            .filter(|action| action.retry_count >= threshold)
            .collect())
    }

    async fn remove_action(&self, id: &ActionId) -> Result<(), AppError> {
        self.store.delete_action(id).await?;
        tracing::info!(target: "offline::store", action_id = %id, "queued action removed");
        Ok(())
    }

    async fn cached_pets(&self) -> Result<Vec<Pet>, AppError> {
        self.store.fetch_pets().await
    }

    async fn cached_alerts(&self) -> Result<Vec<MissingPetAlert>, AppError> {
        self.store.fetch_alerts().await
    }
}
