use super::action_executor::ActionExecutor;
use super::reconciliation::reconcile;
use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{QueuedAction, SyncReport};
use crate::infrastructure::network::ReachabilityMonitor;
use crate::shared::error::AppError;
use crate::shared::metrics::{SyncMetrics, SyncMetricsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusSnapshot {
    pub phase: SyncPhase,
    pub rerun_pending: bool,
    pub pending_actions: u64,
    pub failed_actions: u64,
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub seconds_since_last_sync: Option<i64>,
    pub metrics: SyncMetricsSnapshot,
}

struct SyncCursor {
    phase: SyncPhase,
    rerun: bool,
    completed_passes: u64,
    last_outcome: Option<Result<SyncReport, AppError>>,
}

/// Drains the offline queue against the server, one pass at a time.
///
/// Triggers that arrive while a pass is running are folded into a single
/// follow-up pass.
pub struct SyncEngine {
    store: Arc<dyn OfflineStore>,
    executor: Arc<dyn ActionExecutor>,
    reachability: Arc<ReachabilityMonitor>,
    cursor: Mutex<SyncCursor>,
    completed_tx: watch::Sender<u64>,
    metrics: SyncMetrics,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        executor: Arc<dyn ActionExecutor>,
        reachability: Arc<ReachabilityMonitor>,
    ) -> Self {
        let (completed_tx, _rx) = watch::channel(0);
        Self {
            store,
            executor,
            reachability,
            cursor: Mutex::new(SyncCursor {
                phase: SyncPhase::Idle,
                rerun: false,
                completed_passes: 0,
                last_outcome: None,
            }),
            completed_tx,
            metrics: SyncMetrics::default(),
        }
    }

    /// Runs a pass, or joins the one in progress and waits for its follow-up.
    ///
    /// The caller that starts the engine gets the report of the last pass it
    /// drove; a caller that joins gets the report of the follow-up pass.
    pub async fn perform_full_sync(self: &Arc<Self>) -> Result<SyncReport, AppError> {
        let mut cursor = self.cursor.lock().await;
        match cursor.phase {
            SyncPhase::Syncing => {
                cursor.rerun = true;
                let target = cursor.completed_passes + 2;
                drop(cursor);
                tracing::debug!(target: "offline::sync", "sync in progress, rerun scheduled");

                let mut completed = self.completed_tx.subscribe();
                completed
                    .wait_for(|passes| *passes >= target)
                    .await
                    .map_err(|_| AppError::Internal("sync engine stopped".to_string()))?;

                let cursor = self.cursor.lock().await;
                cursor.last_outcome.clone().unwrap_or_else(|| {
                    Err(AppError::Internal("sync pass left no outcome".to_string()))
                })
            }
            SyncPhase::Idle => {
                if !self.reachability.is_connected() {
                    return Err(AppError::NetworkUnavailable);
                }
                cursor.phase = SyncPhase::Syncing;
                drop(cursor);

                let engine = Arc::clone(self);
                tokio::spawn(async move { engine.drive().await })
                    .await
                    .map_err(|err| AppError::Internal(format!("sync task failed: {err}")))?
            }
        }
    }

    async fn drive(&self) -> Result<SyncReport, AppError> {
        loop {
            let outcome = self.run_pass().await;
            match &outcome {
                Ok(report) if !report.aborted_offline => self.metrics.passes.record_success(),
                _ => self.metrics.passes.record_failure(),
            }

            let mut cursor = self.cursor.lock().await;
            cursor.completed_passes += 1;
            cursor.last_outcome = Some(outcome.clone());
            let passes = cursor.completed_passes;
            let rerun = std::mem::take(&mut cursor.rerun);
            if !rerun {
                cursor.phase = SyncPhase::Idle;
            }
            drop(cursor);

            self.completed_tx.send_replace(passes);
            if !rerun {
                return outcome;
            }
            tracing::debug!(target: "offline::sync", "running coalesced follow-up pass");
        }
    }

    async fn run_pass(&self) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::empty(Utc::now());
        if !self.reachability.is_connected() {
            report.aborted_offline = true;
            report.remaining = u32::try_from(self.store.pending_actions_count().await?)
                .unwrap_or(u32::MAX);
            tracing::info!(target: "offline::sync", "offline, skipping sync pass");
            return Ok(report);
        }
        let actions = self.store.fetch_pending_actions().await.map_err(|err| {
            tracing::error!(target: "offline::sync", error = %err, "failed to read queue");
            err
        })?;
        tracing::info!(target: "offline::sync", queued = actions.len(), "sync pass started");

        for action in actions {
            if !self.reachability.is_connected() {
                report.aborted_offline = true;
                tracing::warn!(
                    target: "offline::sync",
                    action_id = %action.id,
                    "connectivity lost, leaving remaining actions queued"
                );
                break;
            }
            report.attempted += 1;
            if self.process(&action).await? {
                report.synced += 1;
            } else {
                report.failed += 1;
            }
        }

        report.remaining = u32::try_from(self.store.pending_actions_count().await?)
            .unwrap_or(u32::MAX);
        report.finished_at = Utc::now();
        if !report.aborted_offline && self.reachability.is_connected() {
            self.store.record_sync_completed(report.finished_at).await?;
        }

        tracing::info!(
            target: "offline::sync",
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            remaining = report.remaining,
            aborted_offline = report.aborted_offline,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Executes one action. `Ok(false)` means it failed and stays queued, unless it was removed meanwhile.
    async fn process(&self, action: &QueuedAction) -> Result<bool, AppError> {
        let executed = self
            .executor
            .execute(action)
            .await
            .and_then(|entities| action.payload().map(|payload| (payload, entities)));

        match executed {
            Ok((payload, entities)) => {
                let writes = reconcile(
                    self.store.as_ref(),
                    &payload,
                    action.local_entity_id.as_ref(),
                    entities,
                )
                .await?;
                self.store.complete_action(&action.id, writes).await?;
                self.metrics.actions.record_success();
                tracing::debug!(
                    target: "offline::sync",
                    action_id = %action.id,
                    action_type = %action.action_type,
                    "action synced"
                );
                Ok(true)
            }
            Err(err) => {
                self.metrics.actions.record_failure();
                tracing::warn!(
                    target: "offline::sync",
                    action_id = %action.id,
                    action_type = %action.action_type,
                    retry_count = action.retry_count + 1,
                    error = %err,
                    "action failed"
                );
                if let Err(store_err) = self
                    .store
                    .mark_action_failed(&action.id, &err.to_string())
                    .await
                {
                    if store_err.is_storage() {
                        return Err(store_err);
                    }
                    tracing::info!(
                        target: "offline::sync",
                        action_id = %action.id,
                        error = %store_err,
                        "failed action is no longer queued"
                    );
                }
                Ok(false)
            }
        }
    }

    pub async fn status(&self) -> Result<SyncStatusSnapshot, AppError> {
        let (phase, rerun_pending) = {
            let cursor = self.cursor.lock().await;
            (cursor.phase, cursor.rerun)
        };
        let last_successful_sync = self.store.last_successful_sync().await?;
        Ok(SyncStatusSnapshot {
            phase,
            rerun_pending,
            pending_actions: self.store.pending_actions_count().await?,
            failed_actions: self.store.failed_actions_count().await?,
            last_successful_sync,
            seconds_since_last_sync: last_successful_sync
                .map(|at| (Utc::now() - at).num_seconds().max(0)),
            metrics: self.metrics.snapshot(),
        })
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Starts a pass every time reachability flips to connected.
    pub fn spawn_connectivity_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = self.reachability.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let connected = *rx.borrow_and_update();
                if !connected {
                    continue;
                }
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    if let Err(err) = engine.perform_full_sync().await {
                        tracing::warn!(
                            target: "offline::sync",
                            error = %err,
                            "sync after reconnect failed"
                        );
                    }
                });
            }
        })
    }

    /// Periodic pass while connected and the queue is non-empty.
    pub fn schedule_sync(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !engine.reachability.is_connected() {
                    continue;
                }
                match engine.store.pending_actions_count().await {
                    Ok(0) => {}
                    Ok(_) => {
                        if let Err(e) = engine.perform_full_sync().await {
                            tracing::error!(target: "offline::sync", "Sync error: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!(target: "offline::sync", "Sync error: {}", e);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::remote_api::LostPetConfirmation;
    use crate::application::services::action_executor::test_support::MockApi;
    use crate::application::services::action_executor::RemoteActionExecutor;
    use crate::domain::entities::{
        ActionPayload, AlertStatus, CacheWrite, CachedEntity, CanonicalEntity, MarkPetFoundData,
        MarkPetLostData, MissingPetAlert, Pet, QueuedActionDraft, ReportSightingData, Sighting,
    };
    use crate::domain::value_objects::{
        ActionId, ActionStatus, ActionType, EntityId, OfflinePayload,
    };
    use crate::infrastructure::offline::SqliteOfflineStore;
    use async_trait::async_trait;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{Notify, Semaphore};

    async fn setup_store() -> Arc<SqliteOfflineStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Arc::new(SqliteOfflineStore::new(pool))
    }

    fn id(value: &str) -> EntityId {
        EntityId::new(value).unwrap()
    }

    fn found(pet_id: &str) -> QueuedActionDraft {
        QueuedActionDraft::from_payload(
            &ActionPayload::MarkPetFound(MarkPetFoundData { pet_id: id(pet_id) }),
            None,
        )
        .unwrap()
    }

    /// Records what it was asked to run and answers from a fixed script.
    struct RecordingExecutor {
        seen: StdMutex<Vec<String>>,
        fail: bool,
        disconnect_after_first: Option<Arc<ReachabilityMonitor>>,
    }

    impl RecordingExecutor {
        fn succeeding() -> Self {
            Self {
                seen: StdMutex::new(Vec::new()),
                fail: false,
                disconnect_after_first: None,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::succeeding()
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute_payload(
            &self,
            payload: &ActionPayload,
        ) -> Result<Vec<CanonicalEntity>, AppError> {
            let pet_id = payload.pet_id().cloned().unwrap_or_else(|| id("none"));
            self.seen.lock().unwrap().push(pet_id.to_string());
            if let Some(monitor) = &self.disconnect_after_first {
                monitor.set_connected(false);
            }
            if self.fail {
                return Err(AppError::Server {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(vec![CanonicalEntity::Pet(Pet::new(pet_id, "Rex"))])
        }
    }

    /// Blocks its first call until released and tracks concurrent calls.
    struct GatedExecutor {
        entered: Notify,
        gate: Semaphore,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ActionExecutor for GatedExecutor {
        async fn execute_payload(
            &self,
            _payload: &ActionPayload,
        ) -> Result<Vec<CanonicalEntity>, AppError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                let permit = self.gate.acquire().await.unwrap();
                permit.forget();
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(AppError::Network("offline upstream".to_string()))
        }
    }

    /// Deletes one queued action from under the engine while executing it, then fails.
    struct RemovingExecutor {
        store: Arc<SqliteOfflineStore>,
        target: StdMutex<Option<ActionId>>,
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionExecutor for RemovingExecutor {
        async fn execute_payload(
            &self,
            payload: &ActionPayload,
        ) -> Result<Vec<CanonicalEntity>, AppError> {
            let pet_id = payload.pet_id().cloned().unwrap_or_else(|| id("none"));
            self.seen.lock().unwrap().push(pet_id.to_string());
            let target = self.target.lock().unwrap().take();
            if let Some(target) = target {
                self.store.delete_action(&target).await?;
                return Err(AppError::Server {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(vec![CanonicalEntity::Pet(Pet::new(pet_id, "Rex"))])
        }
    }

    /// Notes, for every call, whether the previous action's result is already cached.
    struct OrderObservingExecutor {
        store: Arc<SqliteOfflineStore>,
        observed: StdMutex<Vec<(String, bool, Vec<String>)>>,
        previous: StdMutex<Option<EntityId>>,
    }

    #[async_trait]
    impl ActionExecutor for OrderObservingExecutor {
        async fn execute_payload(
            &self,
            payload: &ActionPayload,
        ) -> Result<Vec<CanonicalEntity>, AppError> {
            let pet_id = payload.pet_id().cloned().unwrap_or_else(|| id("none"));
            let previous = self.previous.lock().unwrap().replace(pet_id.clone());
            if let Some(previous) = previous {
                let cached = self
                    .store
                    .fetch_pet(&previous)
                    .await?
                    .is_some_and(|pet| pet.name == "Rex");
                let queued = self
                    .store
                    .fetch_pending_actions()
                    .await?
                    .iter()
                    .filter_map(|action| action.payload().ok())
                    .filter_map(|payload| payload.pet_id().map(|id| id.to_string()))
                    .collect();
                self.observed
                    .lock()
                    .unwrap()
                    .push((previous.to_string(), cached, queued));
            }
            Ok(vec![CanonicalEntity::Pet(Pet::new(pet_id, "Rex"))])
        }
    }

    fn engine(
        store: Arc<SqliteOfflineStore>,
        executor: Arc<dyn ActionExecutor>,
        monitor: Arc<ReachabilityMonitor>,
    ) -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(store, executor, monitor))
    }

    #[tokio::test]
    async fn test_actions_run_in_creation_order() {
        let store = setup_store().await;
        for pet in ["pet-a", "pet-b", "pet-c"] {
            store.enqueue_action(found(pet)).await.unwrap();
        }
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(executor.seen(), vec!["pet-a", "pet-b", "pet-c"]);
        assert_eq!(report.synced, 3);
        assert_eq!(report.remaining, 0);
        assert!(store.fetch_pending_actions().await.unwrap().is_empty());
        assert_eq!(store.fetch_pets().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_each_result_is_cached_before_the_next_action_runs() {
        let store = setup_store().await;
        for pet in ["pet-a", "pet-b", "pet-c"] {
            store.enqueue_action(found(pet)).await.unwrap();
        }
        let executor = Arc::new(OrderObservingExecutor {
            store: store.clone(),
            observed: StdMutex::new(Vec::new()),
            previous: StdMutex::new(None),
        });
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        engine.perform_full_sync().await.unwrap();

        let observed = executor.observed.lock().unwrap().clone();
        assert_eq!(
            observed,
            vec![
                (
                    "pet-a".to_string(),
                    true,
                    vec!["pet-b".to_string(), "pet-c".to_string()]
                ),
                ("pet-b".to_string(), true, vec!["pet-c".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_action_removed_mid_pass_does_not_block_the_rest() {
        let store = setup_store().await;
        let first = store.enqueue_action(found("pet-a")).await.unwrap();
        for pet in ["pet-b", "pet-c"] {
            store.enqueue_action(found(pet)).await.unwrap();
        }
        let executor = Arc::new(RemovingExecutor {
            store: store.clone(),
            target: StdMutex::new(Some(first.id.clone())),
            seen: StdMutex::new(Vec::new()),
        });
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(
            executor.seen.lock().unwrap().clone(),
            vec!["pet-a", "pet-b", "pet-c"]
        );
        assert_eq!((report.synced, report.failed, report.remaining), (2, 1, 0));
        assert!(store.fetch_action(&first.id).await.unwrap().is_none());
        assert!(store.last_successful_sync().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_found_clears_optimistic_alerts() {
        let store = setup_store().await;
        let mut alert = MissingPetAlert::new(id("alert-1"), id("pet-1"), Utc::now());
        alert.status = AlertStatus::Found;
        let payload = ActionPayload::MarkPetFound(MarkPetFoundData { pet_id: id("pet-1") });
        store
            .enqueue_with_optimistic(
                QueuedActionDraft::from_payload(&payload, None).unwrap(),
                vec![CacheWrite::optimistic(CachedEntity::Alert(alert))],
            )
            .await
            .unwrap();
        let engine = engine(
            store.clone(),
            Arc::new(RecordingExecutor::succeeding()),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        engine.perform_full_sync().await.unwrap();

        let (optimistic, status): (bool, String) =
            sqlx::query_as("SELECT is_optimistic, status FROM cached_alerts WHERE id = ?1")
                .bind("alert-1")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert!(!optimistic);
        assert_eq!(status, "found");
    }

    #[tokio::test]
    async fn test_empty_drain_is_idempotent() {
        let store = setup_store().await;
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let first = engine.perform_full_sync().await.unwrap();
        let second = engine.perform_full_sync().await.unwrap();

        assert_eq!((first.attempted, first.remaining), (0, 0));
        assert_eq!((second.attempted, second.remaining), (0, 0));
        assert!(executor.seen().is_empty());
        assert!(store.last_successful_sync().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_sync_request_is_rejected() {
        let store = setup_store().await;
        store.enqueue_action(found("pet-1")).await.unwrap();
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(false)),
        );

        let err = engine.perform_full_sync().await.unwrap_err();

        assert!(matches!(err, AppError::NetworkUnavailable));
        assert!(executor.seen().is_empty());
        assert_eq!(store.pending_actions_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_action_stays_queued() {
        let store = setup_store().await;
        let queued = store.enqueue_action(found("pet-1")).await.unwrap();
        let engine = engine(
            store.clone(),
            Arc::new(RecordingExecutor::failing()),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!((report.failed, report.remaining), (1, 1));
        let stored = store.fetch_action(&queued.id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.status, ActionStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("Server error (500): boom"));
        assert_eq!(stored.data, queued.data);

        engine.perform_full_sync().await.unwrap();
        let stored = store.fetch_action(&queued.id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 2);
        assert_eq!(engine.metrics().actions.failures, 2);
    }

    #[tokio::test]
    async fn test_undecodable_action_fails_and_pass_continues() {
        let store = setup_store().await;
        let bad = store
            .enqueue_action(QueuedActionDraft {
                action_type: ActionType::from("archivePet"),
                data: OfflinePayload::new(json!({"petId": "pet-0"})).unwrap(),
                local_entity_id: None,
            })
            .await
            .unwrap();
        let missing = store
            .enqueue_action(QueuedActionDraft {
                action_type: ActionType::MarkPetLost,
                data: OfflinePayload::new(json!({"description": "no pet id"})).unwrap(),
                local_entity_id: None,
            })
            .await
            .unwrap();
        store.enqueue_action(found("pet-2")).await.unwrap();
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!((report.synced, report.failed), (1, 2));
        assert_eq!(executor.seen(), vec!["pet-2"]);
        let bad = store.fetch_action(&bad.id).await.unwrap().unwrap();
        assert_eq!(
            bad.error_message.as_deref(),
            Some("Invalid action type: archivePet")
        );
        let missing = store.fetch_action(&missing.id).await.unwrap().unwrap();
        assert_eq!(missing.error_message.as_deref(), Some("Missing data: petId"));
    }

    #[tokio::test]
    async fn test_disconnect_leaves_remaining_actions_untouched() {
        let store = setup_store().await;
        for pet in ["pet-a", "pet-b", "pet-c"] {
            store.enqueue_action(found(pet)).await.unwrap();
        }
        let monitor = Arc::new(ReachabilityMonitor::new(true));
        let executor = Arc::new(RecordingExecutor {
            disconnect_after_first: Some(monitor.clone()),
            ..RecordingExecutor::succeeding()
        });
        let engine = engine(store.clone(), executor.clone(), monitor);

        let report = engine.perform_full_sync().await.unwrap();

        assert!(report.aborted_offline);
        assert_eq!((report.attempted, report.synced, report.remaining), (1, 1, 2));
        assert_eq!(executor.seen(), vec!["pet-a"]);
        for action in store.fetch_pending_actions().await.unwrap() {
            assert_eq!(action.retry_count, 0);
            assert_eq!(action.status, ActionStatus::Pending);
        }
        assert!(store.last_successful_sync().await.unwrap().is_none());
        assert_eq!(engine.metrics().passes.failures, 1);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_coalesce_into_one_rerun() {
        let store = setup_store().await;
        store.enqueue_action(found("pet-1")).await.unwrap();
        let executor = Arc::new(GatedExecutor {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let engine = engine(
            store.clone(),
            executor.clone(),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.perform_full_sync().await }
        });
        executor.entered.notified().await;

        let joiners: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.perform_full_sync().await })
            })
            .collect();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(engine.status().await.unwrap().rerun_pending);

        executor.gate.add_permits(10);
        first.await.unwrap().unwrap();
        for joiner in joiners {
            joiner.await.unwrap().unwrap();
        }

        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(executor.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(engine.metrics().passes.successes, 2);
        let status = engine.status().await.unwrap();
        assert_eq!(status.phase, SyncPhase::Idle);
        assert!(!status.rerun_pending);
    }

    #[tokio::test]
    async fn test_offline_follow_up_pass_records_no_sync() {
        let store = setup_store().await;
        store.enqueue_action(found("pet-1")).await.unwrap();
        let monitor = Arc::new(ReachabilityMonitor::new(true));
        let executor = Arc::new(GatedExecutor {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let engine = engine(store.clone(), executor.clone(), monitor.clone());

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.perform_full_sync().await }
        });
        executor.entered.notified().await;
        let joiner = tokio::spawn({
            let engine = engine.clone();
            async move { engine.perform_full_sync().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(engine.status().await.unwrap().rerun_pending);

        monitor.set_connected(false);
        executor.gate.add_permits(10);
        first.await.unwrap().unwrap();
        let follow_up = joiner.await.unwrap().unwrap();

        assert!(follow_up.aborted_offline);
        assert_eq!((follow_up.attempted, follow_up.remaining), (0, 1));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert!(store.last_successful_sync().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_pet_lost_reconciles_atomically() {
        let store = setup_store().await;
        let placeholder = EntityId::placeholder();
        let mut optimistic_pet = Pet::new(id("pet-1"), "Rex");
        optimistic_pet.is_missing = true;
        let payload = ActionPayload::MarkPetLost(MarkPetLostData::new(id("pet-1")));
        store
            .enqueue_with_optimistic(
                QueuedActionDraft::from_payload(&payload, Some(placeholder.clone())).unwrap(),
                vec![
                    CacheWrite::optimistic(CachedEntity::Pet(optimistic_pet)),
                    CacheWrite::optimistic(CachedEntity::Alert(MissingPetAlert::new(
                        placeholder.clone(),
                        id("pet-1"),
                        Utc::now(),
                    ))),
                ],
            )
            .await
            .unwrap();

        let mut api = MockApi::new();
        api.expect_mark_pet_lost().times(1).returning(|data| {
            let mut pet = Pet::new(data.pet_id.clone(), "Rex");
            pet.is_missing = true;
            Ok(LostPetConfirmation {
                alert: Some(MissingPetAlert::new(
                    EntityId::new("alert-1").unwrap(),
                    pet.id.clone(),
                    Utc::now(),
                )),
                pet,
            })
        });
        let engine = engine(
            store.clone(),
            Arc::new(RemoteActionExecutor::new(Arc::new(api))),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        engine.perform_full_sync().await.unwrap();

        assert!(store.fetch_pending_actions().await.unwrap().is_empty());
        let pets = store.fetch_pets().await.unwrap();
        assert_eq!(pets.len(), 1);
        assert!(pets[0].is_missing);
        let alerts = store.fetch_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id.as_str(), "alert-1");
        assert!(store.fetch_alert(&placeholder).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_sighting_reaches_api_with_notes() {
        let store = setup_store().await;
        store
            .upsert_entity(CachedEntity::Alert(MissingPetAlert::new(
                id("alert-1"),
                id("pet-1"),
                Utc::now(),
            )))
            .await
            .unwrap();
        store
            .enqueue_action(QueuedActionDraft {
                action_type: ActionType::ReportSighting,
                data: OfflinePayload::new(json!({
                    "alertId": "alert-1",
                    "sightingNotes": "seen near the park"
                }))
                .unwrap(),
                local_entity_id: None,
            })
            .await
            .unwrap();

        let mut api = MockApi::new();
        api.expect_report_sighting()
            .withf(|data: &ReportSightingData| {
                data.alert_id.as_str() == "alert-1"
                    && data.notes.as_deref() == Some("seen near the park")
            })
            .times(1)
            .returning(|data| {
                Ok(Sighting {
                    id: EntityId::new("s-1").unwrap(),
                    alert_id: data.alert_id.clone(),
                    reporter_name: None,
                    reporter_phone: None,
                    location: None,
                    notes: data.notes.clone(),
                    sighted_at: Utc::now(),
                })
            });
        let engine = engine(
            store.clone(),
            Arc::new(RemoteActionExecutor::new(Arc::new(api))),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(report.synced, 1);
        let alert = store.fetch_alert(&id("alert-1")).await.unwrap().unwrap();
        assert_eq!(alert.sightings.len(), 1);
        assert_eq!(alert.sightings[0].notes.as_deref(), Some("seen near the park"));
    }

    #[tokio::test]
    async fn test_reconnect_triggers_sync() {
        let store = setup_store().await;
        store.enqueue_action(found("pet-1")).await.unwrap();
        let monitor = Arc::new(ReachabilityMonitor::new(false));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = engine(store.clone(), executor.clone(), monitor.clone());
        let listener = engine.spawn_connectivity_listener();

        monitor.set_connected(true);

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.pending_actions_count().await.unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(executor.seen(), vec!["pet-1"]);

        listener.abort();
    }

    #[tokio::test]
    async fn test_status_reports_counts_and_last_sync() {
        let store = setup_store().await;
        store.enqueue_action(found("pet-1")).await.unwrap();
        let engine = engine(
            store.clone(),
            Arc::new(RecordingExecutor::failing()),
            Arc::new(ReachabilityMonitor::new(true)),
        );

        let before = engine.status().await.unwrap();
        assert_eq!(before.pending_actions, 1);
        assert!(before.last_successful_sync.is_none());

        engine.perform_full_sync().await.unwrap();

        let after = engine.status().await.unwrap();
        assert_eq!(after.phase, SyncPhase::Idle);
        assert_eq!((after.pending_actions, after.failed_actions), (1, 1));
        assert!(after.seconds_since_last_sync.is_some());
    }
}
