use async_trait::async_trait;

/// Platform primitive answering "can the network be used right now".
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}
