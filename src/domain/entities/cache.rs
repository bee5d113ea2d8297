use super::alert::{MissingPetAlert, Sighting};
use super::pet::Pet;
use crate::domain::value_objects::EntityId;
use serde::{Deserialize, Serialize};

/// A record held in the offline cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedEntity {
    Pet(Pet),
    Alert(MissingPetAlert),
}

impl CachedEntity {
    pub fn id(&self) -> &EntityId {
        match self {
            CachedEntity::Pet(pet) => &pet.id,
            CachedEntity::Alert(alert) => &alert.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CachedEntity::Pet(_) => "pet",
            CachedEntity::Alert(_) => "alert",
        }
    }
}

/// The server's authoritative version of an entity returned by a remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanonicalEntity {
    Pet(Pet),
    Alert(MissingPetAlert),
    Sighting(Sighting),
}

/// A single cache mutation applied inside the store's transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheWrite {
    /// Insert or overwrite by id. `optimistic` marks records not yet confirmed by the server.
    Upsert {
        entity: CachedEntity,
        optimistic: bool,
    },
    /// Delete `old_id` and insert `entity` as one step. Always canonical.
    Replace {
        old_id: EntityId,
        entity: CachedEntity,
    },
}

impl CacheWrite {
    pub fn optimistic(entity: CachedEntity) -> Self {
        CacheWrite::Upsert {
            entity,
            optimistic: true,
        }
    }

    pub fn canonical(entity: CachedEntity) -> Self {
        CacheWrite::Upsert {
            entity,
            optimistic: false,
        }
    }
}
