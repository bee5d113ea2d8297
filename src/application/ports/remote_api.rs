use crate::domain::entities::{
    CreateAlertData, MarkPetFoundData, MarkPetLostData, MissingPetAlert, Pet, ReportSightingData,
    Sighting, UpdatePetData,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostPetConfirmation {
    pub pet: Pet,
    #[serde(default)]
    pub alert: Option<MissingPetAlert>,
}

/// Remote PetSafety service, one call per replayable action.
#[async_trait]
pub trait PetSafetyApi: Send + Sync {
    async fn mark_pet_lost(&self, data: &MarkPetLostData) -> Result<LostPetConfirmation, AppError>;
    async fn mark_pet_found(&self, data: &MarkPetFoundData) -> Result<Pet, AppError>;
    async fn report_sighting(&self, data: &ReportSightingData) -> Result<Sighting, AppError>;
    async fn create_alert(&self, data: &CreateAlertData) -> Result<MissingPetAlert, AppError>;
    async fn update_pet(&self, data: &UpdatePetData) -> Result<Pet, AppError>;
}
