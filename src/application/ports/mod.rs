pub mod offline_store;
pub mod reachability;
pub mod remote_api;

pub use offline_store::OfflineStore;
pub use reachability::ReachabilityProbe;
pub use remote_api::{LostPetConfirmation, PetSafetyApi};
