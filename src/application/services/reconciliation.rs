use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{
    ActionPayload, AlertStatus, CacheWrite, CachedEntity, CanonicalEntity,
};
use crate::domain::value_objects::EntityId;
use crate::shared::error::AppError;

/// Turns the server's answer to an action into cache writes.
///
/// `local_entity_id` is the placeholder the optimistic write used, if any.
/// Writes are returned in application order; the caller commits them together
/// with the action's removal from the queue.
pub async fn reconcile(
    store: &dyn OfflineStore,
    payload: &ActionPayload,
    local_entity_id: Option<&EntityId>,
    entities: Vec<CanonicalEntity>,
) -> Result<Vec<CacheWrite>, AppError> {
    let mut writes = Vec::with_capacity(entities.len());

    for entity in entities {
        match entity {
            CanonicalEntity::Pet(pet) => {
                let old_id = payload.pet_id().cloned().unwrap_or_else(|| pet.id.clone());
                if matches!(payload, ActionPayload::MarkPetFound(_)) {
                    writes.extend(resolved_alerts(store, &pet.id).await?);
                }
                writes.push(CacheWrite::Replace {
                    old_id,
                    entity: CachedEntity::Pet(pet),
                });
            }
            CanonicalEntity::Alert(alert) => {
                let placeholder = local_entity_id.filter(|id| id.is_placeholder());
                writes.push(match placeholder {
                    Some(old_id) => CacheWrite::Replace {
                        old_id: old_id.clone(),
                        entity: CachedEntity::Alert(alert),
                    },
                    None => CacheWrite::canonical(CachedEntity::Alert(alert)),
                });
            }
            CanonicalEntity::Sighting(sighting) => {
                let Some(mut alert) = store.fetch_alert(&sighting.alert_id).await? else {
                    tracing::debug!(
                        target: "offline::sync",
                        alert_id = %sighting.alert_id,
                        "sighting confirmed for uncached alert"
                    );
                    continue;
                };
                if let Some(placeholder) = local_entity_id {
                    alert.remove_sighting(placeholder);
                }
                alert.put_sighting(sighting);
                writes.push(CacheWrite::canonical(CachedEntity::Alert(alert)));
            }
        }
    }

    Ok(writes)
}

/// A found pet closes its alerts on the server; the cached copies follow.
async fn resolved_alerts(
    store: &dyn OfflineStore,
    pet_id: &EntityId,
) -> Result<Vec<CacheWrite>, AppError> {
    Ok(store
        .fetch_alerts()
        .await?
        .into_iter()
        .filter(|alert| &alert.pet_id == pet_id && alert.status != AlertStatus::Cancelled)
        .map(|mut alert| {
            alert.status = AlertStatus::Found;
            CacheWrite::canonical(CachedEntity::Alert(alert))
        })
        .collect())
}
