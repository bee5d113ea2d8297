pub mod action_executor;
pub mod offline_service;
pub mod reconciliation;
pub mod sync_engine;

pub use action_executor::{ActionExecutor, RemoteActionExecutor};
pub use offline_service::{ActionDisposition, OfflineService, OfflineServiceTrait};
pub use sync_engine::{SyncEngine, SyncPhase, SyncStatusSnapshot};
