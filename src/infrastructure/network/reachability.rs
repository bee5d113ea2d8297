use crate::application::ports::reachability::ReachabilityProbe;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Current "network usable" flag with change notification.
pub struct ReachabilityMonitor {
    tx: watch::Sender<bool>,
}

impl ReachabilityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_connected);
        Self { tx }
    }

    /// Seeds the flag from a single probe.
    pub async fn probe_initial(probe: &dyn ReachabilityProbe) -> Self {
        let connected = probe.probe().await;
        tracing::info!(
            target: "network::reachability",
            connected,
            "initial reachability"
        );
        Self::new(connected)
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Publishes a new value. Returns `true` when it differs from the previous one.
    pub fn set_connected(&self, connected: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            tracing::info!(
                target: "network::reachability",
                connected,
                "reachability changed"
            );
        }
        changed
    }

    pub fn spawn_polling(
        self: &Arc<Self>,
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let connected = probe.probe().await;
                monitor.set_connected(connected);
            }
        })
    }
}

/// Treats the network as usable when a TCP connection to `host:port` opens in time.
pub struct TcpReachabilityProbe {
    target: String,
    timeout: Duration,
}

impl TcpReachabilityProbe {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpReachabilityProbe {
    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::debug!(
                    target: "network::reachability",
                    host = %self.target,
                    error = %err,
                    "probe connect failed"
                );
                false
            }
            Err(_) => {
                tracing::debug!(
                    target: "network::reachability",
                    host = %self.target,
                    "probe timed out"
                );
                false
            }
        }
    }
}
