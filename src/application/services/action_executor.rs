use crate::application::ports::remote_api::PetSafetyApi;
use crate::domain::entities::{ActionPayload, CanonicalEntity, QueuedAction};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;

/// Replays one action against the server and returns the canonical entities it produced.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute_payload(&self, payload: &ActionPayload)
        -> Result<Vec<CanonicalEntity>, AppError>;

    /// Decodes the stored parameters before dispatching.
    async fn execute(&self, action: &QueuedAction) -> Result<Vec<CanonicalEntity>, AppError> {
        let payload = action.payload()?;
        self.execute_payload(&payload).await
    }
}

pub struct RemoteActionExecutor {
    api: Arc<dyn PetSafetyApi>,
}

impl RemoteActionExecutor {
    pub fn new(api: Arc<dyn PetSafetyApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ActionExecutor for RemoteActionExecutor {
    async fn execute_payload(
        &self,
        payload: &ActionPayload,
    ) -> Result<Vec<CanonicalEntity>, AppError> {
        tracing::debug!(
            target: "offline::executor",
            action_type = %payload.action_type(),
            "executing action"
        );

        match payload {
            ActionPayload::MarkPetLost(data) => {
                let confirmation = self.api.mark_pet_lost(data).await?;
                let mut entities = vec![CanonicalEntity::Pet(confirmation.pet)];
                if let Some(alert) = confirmation.alert {
                    entities.push(CanonicalEntity::Alert(alert));
                }
                Ok(entities)
            }
            ActionPayload::MarkPetFound(data) => {
                let pet = self.api.mark_pet_found(data).await?;
                Ok(vec![CanonicalEntity::Pet(pet)])
            }
            ActionPayload::ReportSighting(data) => {
                let sighting = self.api.report_sighting(data).await?;
                Ok(vec![CanonicalEntity::Sighting(sighting)])
            }
            ActionPayload::CreateAlert(data) => {
                let alert = self.api.create_alert(data).await?;
                Ok(vec![CanonicalEntity::Alert(alert)])
            }
            ActionPayload::UpdatePet(data) => {
                let pet = self.api.update_pet(data).await?;
                Ok(vec![CanonicalEntity::Pet(pet)])
            }
            ActionPayload::UpdateAlert(_) => Err(AppError::NotImplemented(
                payload.action_type().description(),
            )),
        }
    }
}
