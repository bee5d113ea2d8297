pub mod action_id;
pub mod action_status;
pub mod action_type;
pub mod entity_id;
pub mod location;
pub mod payload;

pub use action_id::ActionId;
pub use action_status::ActionStatus;
pub use action_type::ActionType;
pub use entity_id::EntityId;
pub use location::Location;
pub use payload::OfflinePayload;
