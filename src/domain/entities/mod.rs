pub mod action_payload;
pub mod alert;
pub mod cache;
pub mod pet;
pub mod queued_action;
pub mod sync_report;

pub use action_payload::{
    ActionPayload, CreateAlertData, MarkPetFoundData, MarkPetLostData, ReportSightingData,
    UpdateAlertData, UpdatePetData,
};
pub use alert::{AlertStatus, MissingPetAlert, Sighting};
pub use cache::{CacheWrite, CachedEntity, CanonicalEntity};
pub use pet::{Pet, PetChanges};
pub use queued_action::{QueuedAction, QueuedActionDraft};
pub use sync_report::SyncReport;
