use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a queued action. Determines which remote call replays it.
///
/// `Unknown` preserves rows written by a build that knew a type this one
/// does not; such actions stay queued and fail with `InvalidActionType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    MarkPetLost,
    MarkPetFound,
    ReportSighting,
    CreateAlert,
    UpdatePet,
    UpdateAlert,
    Unknown(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::MarkPetLost => "markPetLost",
            ActionType::MarkPetFound => "markPetFound",
            ActionType::ReportSighting => "reportSighting",
            ActionType::CreateAlert => "createAlert",
            ActionType::UpdatePet => "updatePet",
            ActionType::UpdateAlert => "updateAlert",
            ActionType::Unknown(value) => value.as_str(),
        }
    }

    /// Human-readable label for pending-sync screens.
    pub fn description(&self) -> String {
        match self {
            ActionType::MarkPetLost => "Mark pet as lost".to_string(),
            ActionType::MarkPetFound => "Mark pet as found".to_string(),
            ActionType::ReportSighting => "Report sighting".to_string(),
            ActionType::CreateAlert => "Create missing pet alert".to_string(),
            ActionType::UpdatePet => "Update pet details".to_string(),
            ActionType::UpdateAlert => "Update alert".to_string(),
            ActionType::Unknown(value) => format!("Unknown action ({value})"),
        }
    }

    /// Payload keys that must be present before the action can be replayed.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ActionType::MarkPetLost
            | ActionType::MarkPetFound
            | ActionType::CreateAlert
            | ActionType::UpdatePet => &["petId"],
            ActionType::ReportSighting | ActionType::UpdateAlert => &["alertId"],
            ActionType::Unknown(_) => &[],
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActionType::Unknown(_))
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        match value {
            "markPetLost" => ActionType::MarkPetLost,
            "markPetFound" => ActionType::MarkPetFound,
            "reportSighting" => ActionType::ReportSighting,
            "createAlert" => ActionType::CreateAlert,
            "updatePet" => ActionType::UpdatePet,
            "updateAlert" => ActionType::UpdateAlert,
            other => ActionType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
