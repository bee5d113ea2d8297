pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    ActionDisposition, OfflineService, OfflineServiceTrait, SyncEngine, SyncPhase,
    SyncStatusSnapshot,
};
pub use shared::error::AppError;
pub use shared::logging::init as init_logging;
pub use state::AppState;
