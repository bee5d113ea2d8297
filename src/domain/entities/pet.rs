use crate::domain::value_objects::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_missing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pet {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            species: None,
            breed: None,
            color: None,
            photo_url: None,
            notes: None,
            is_missing: false,
            updated_at: None,
        }
    }

    /// Minimal record used when an offline action targets a pet that was never cached.
    pub fn stub(id: EntityId) -> Self {
        Self::new(id, "")
    }

    pub fn apply_changes(&mut self, changes: &PetChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(species) = &changes.species {
            self.species = Some(species.clone());
        }
        if let Some(breed) = &changes.breed {
            self.breed = Some(breed.clone());
        }
        if let Some(color) = &changes.color {
            self.color = Some(color.clone());
        }
        if let Some(photo_url) = &changes.photo_url {
            self.photo_url = Some(photo_url.clone());
        }
        if let Some(notes) = &changes.notes {
            self.notes = Some(notes.clone());
        }
    }
}

/// Fields of a pet that an `updatePet` action may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PetChanges {
    pub fn is_empty(&self) -> bool {
        self == &PetChanges::default()
    }
}
