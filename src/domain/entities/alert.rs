use crate::domain::value_objects::{EntityId, Location};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Found,
    Cancelled,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Found => "found",
            AlertStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPetAlert {
    pub id: EntityId,
    pub pet_id: EntityId,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_radius_km: Option<f64>,
    /// Ordered by arrival.
    #[serde(default)]
    pub sightings: Vec<Sighting>,
    pub created_at: DateTime<Utc>,
}

impl MissingPetAlert {
    pub fn new(id: EntityId, pet_id: EntityId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            pet_id,
            status: AlertStatus::Active,
            last_seen_location: None,
            description: None,
            reward_amount: None,
            alert_radius_km: None,
            sightings: Vec::new(),
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Replaces the sighting with `id` (or appends) keeping arrival order.
    pub fn put_sighting(&mut self, sighting: Sighting) {
        match self.sightings.iter_mut().find(|s| s.id == sighting.id) {
            Some(existing) => *existing = sighting,
            None => self.sightings.push(sighting),
        }
    }

    pub fn remove_sighting(&mut self, id: &EntityId) -> Option<Sighting> {
        let index = self.sightings.iter().position(|s| &s.id == id)?;
        Some(self.sightings.remove(index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub id: EntityId,
    pub alert_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sighted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(id: &str) -> Sighting {
        Sighting {
            id: EntityId::new(id).unwrap(),
            alert_id: EntityId::new("alert-1").unwrap(),
            reporter_name: None,
            reporter_phone: None,
            location: None,
            notes: None,
            sighted_at: Utc::now(),
        }
    }

    #[test]
    fn put_sighting_replaces_in_place() {
        let mut alert = MissingPetAlert::new(
            EntityId::new("alert-1").unwrap(),
            EntityId::new("pet-1").unwrap(),
            Utc::now(),
        );
        alert.put_sighting(sighting("s1"));
        alert.put_sighting(sighting("s2"));

        let mut updated = sighting("s1");
        updated.notes = Some("near the park".to_string());
        alert.put_sighting(updated);

        let ids: Vec<_> = alert.sightings.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(alert.sightings[0].notes.as_deref(), Some("near the park"));
    }

    #[test]
    fn remove_sighting_reports_absence() {
        let mut alert = MissingPetAlert::new(
            EntityId::new("alert-1").unwrap(),
            EntityId::new("pet-1").unwrap(),
            Utc::now(),
        );
        assert!(alert.remove_sighting(&EntityId::new("missing").unwrap()).is_none());
    }
}
