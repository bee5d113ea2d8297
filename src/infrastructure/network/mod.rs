pub mod http_api;
pub mod reachability;

pub use http_api::HttpPetSafetyApi;
pub use reachability::{ReachabilityMonitor, TcpReachabilityProbe};
