use super::pet::PetChanges;
use crate::domain::value_objects::{ActionType, EntityId, Location, OfflinePayload};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPetLostData {
    pub pet_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
}

impl MarkPetLostData {
    pub fn new(pet_id: EntityId) -> Self {
        Self {
            pet_id,
            latitude: None,
            longitude: None,
            last_seen_address: None,
            description: None,
            reward_amount: None,
        }
    }

    /// Last-seen location, when both coordinates were captured.
    pub fn location(&self) -> Option<Location> {
        let location = Location::new(self.latitude?, self.longitude?);
        Some(match &self.last_seen_address {
            Some(address) => location.with_address(address.clone()),
            None => location,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPetFoundData {
    pub pet_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSightingData {
    pub alert_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(
        default,
        rename = "sightingNotes",
        alias = "notes",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sighted_at: Option<DateTime<Utc>>,
}

impl ReportSightingData {
    pub fn new(alert_id: EntityId) -> Self {
        Self {
            alert_id,
            reporter_name: None,
            reporter_phone: None,
            location: None,
            notes: None,
            sighted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertData {
    pub pet_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_radius_km: Option<f64>,
}

impl CreateAlertData {
    pub fn new(pet_id: EntityId) -> Self {
        Self {
            pet_id,
            location: None,
            description: None,
            reward_amount: None,
            alert_radius_km: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePetData {
    pub pet_id: EntityId,
    #[serde(flatten)]
    pub changes: PetChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertData {
    pub alert_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_radius_km: Option<f64>,
}

/// Parameters of a queued action, one strongly-typed variant per action type.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    MarkPetLost(MarkPetLostData),
    MarkPetFound(MarkPetFoundData),
    ReportSighting(ReportSightingData),
    CreateAlert(CreateAlertData),
    UpdatePet(UpdatePetData),
    UpdateAlert(UpdateAlertData),
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::MarkPetLost(_) => ActionType::MarkPetLost,
            ActionPayload::MarkPetFound(_) => ActionType::MarkPetFound,
            ActionPayload::ReportSighting(_) => ActionType::ReportSighting,
            ActionPayload::CreateAlert(_) => ActionType::CreateAlert,
            ActionPayload::UpdatePet(_) => ActionType::UpdatePet,
            ActionPayload::UpdateAlert(_) => ActionType::UpdateAlert,
        }
    }

    /// Pet the action targets, if any.
    pub fn pet_id(&self) -> Option<&EntityId> {
        match self {
            ActionPayload::MarkPetLost(data) => Some(&data.pet_id),
            ActionPayload::MarkPetFound(data) => Some(&data.pet_id),
            ActionPayload::CreateAlert(data) => Some(&data.pet_id),
            ActionPayload::UpdatePet(data) => Some(&data.pet_id),
            ActionPayload::ReportSighting(_) | ActionPayload::UpdateAlert(_) => None,
        }
    }

    /// Alert the action targets, if any.
    pub fn alert_id(&self) -> Option<&EntityId> {
        match self {
            ActionPayload::ReportSighting(data) => Some(&data.alert_id),
            ActionPayload::UpdateAlert(data) => Some(&data.alert_id),
            _ => None,
        }
    }

    pub fn to_data(&self) -> Result<OfflinePayload, AppError> {
        let value = match self {
            ActionPayload::MarkPetLost(data) => serde_json::to_value(data),
            ActionPayload::MarkPetFound(data) => serde_json::to_value(data),
            ActionPayload::ReportSighting(data) => serde_json::to_value(data),
            ActionPayload::CreateAlert(data) => serde_json::to_value(data),
            ActionPayload::UpdatePet(data) => serde_json::to_value(data),
            ActionPayload::UpdateAlert(data) => serde_json::to_value(data),
        }
        .map_err(|err| AppError::SerializationError(err.to_string()))?;

        OfflinePayload::new(value).map_err(AppError::SerializationError)
    }

    /// Decodes stored parameters, checking the required keys of `action_type` first.
    pub fn decode(action_type: &ActionType, data: &OfflinePayload) -> Result<Self, AppError> {
        if let ActionType::Unknown(raw) = action_type {
            return Err(AppError::InvalidActionType(raw.clone()));
        }
        if let Some(key) = action_type
            .required_keys()
            .iter()
            .copied()
            .find(|key| !data.has_value(key))
        {
            return Err(AppError::MissingData(key.to_string()));
        }

        let payload = match action_type {
            ActionType::MarkPetLost => ActionPayload::MarkPetLost(parse(data)?),
            ActionType::MarkPetFound => ActionPayload::MarkPetFound(parse(data)?),
            ActionType::ReportSighting => ActionPayload::ReportSighting(parse(data)?),
            ActionType::CreateAlert => ActionPayload::CreateAlert(parse(data)?),
            ActionType::UpdatePet => ActionPayload::UpdatePet(parse(data)?),
            ActionType::UpdateAlert => ActionPayload::UpdateAlert(parse(data)?),
            ActionType::Unknown(raw) => return Err(AppError::InvalidActionType(raw.clone())),
        };
        Ok(payload)
    }
}

fn parse<T: DeserializeOwned>(data: &OfflinePayload) -> Result<T, AppError> {
    serde_json::from_value(data.as_json().clone())
        .map_err(|err| AppError::DeserializationError(err.to_string()))
}
