use chrono::Utc;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use fleetguard_shared::config::MonitorSettings;
use fleetguard_shared::logging::LogCategory;
use fleetguard_shared::{
    log_debug, log_dispatch, log_info, log_inventory, log_system, log_warn, ActionStatus,
    DetectionResult,
};

use crate::detector::{Detector, SpikeDetector, TrendDetector};
use crate::dispatcher::Dispatcher;
use crate::executor::RemediationExecutor;
use crate::inventory::InventorySource;
use crate::notifier::NotificationSink;
use crate::rules::RuleTable;
use crate::store::SampleStore;

/// ポーリングループ本体
/// インベントリ取得 → サンプル更新 → 検知 → ディスパッチを1サイクルとして回す
pub struct Regulator {
    inventory: Arc<dyn InventorySource>,
    detectors: Vec<Box<dyn Detector>>,
    dispatcher: Dispatcher,
    store: SampleStore,
    poll_interval: std::time::Duration,
}

impl Regulator {
    pub fn new(
        settings: &MonitorSettings,
        inventory: Arc<dyn InventorySource>,
        notifier: Arc<dyn NotificationSink>,
        executor: Arc<dyn RemediationExecutor>,
    ) -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(SpikeDetector::new(settings.spike_threshold_mb)),
            Box::new(TrendDetector::new(settings.trend_threshold)),
        ];

        let dispatcher = Dispatcher::new(
            RuleTable::default(),
            notifier,
            executor,
            settings.remediation,
            settings.cooldown_window(),
        );

        Self {
            inventory,
            detectors,
            dispatcher,
            store: SampleStore::new(settings.window_capacity),
            poll_interval: settings.poll_interval(),
        }
    }

    /// サンプルストアの参照（テストと診断用）
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// 1サイクル実行
    pub async fn run_cycle(&mut self) {
        let snapshots = match self.inventory.list_processes().await {
            Ok(list) => list,
            Err(e) => {
                // インベントリ欠落はこのサイクルをプロセスゼロとして扱う
                // 一時的な取得失敗で既存の履歴を消さないよう、エビクションもしない
                log_inventory!(warn, "Failed to fetch process list: {e:#}");
                return;
            }
        };

        for snapshot in &snapshots {
            let samples = self
                .store
                .observe(snapshot.id, &snapshot.name, snapshot.memory_mb)
                .to_vec();

            let results: Vec<DetectionResult> = self
                .detectors
                .iter()
                .map(|detector| detector.evaluate(&samples))
                .collect();

            for result in &results {
                if let Some(entry) = self.store.entry_mut(snapshot.id) {
                    let outcomes = self
                        .dispatcher
                        .dispatch(snapshot, result, entry, Utc::now())
                        .await;

                    for outcome in &outcomes {
                        match outcome.status {
                            ActionStatus::Failure => log_dispatch!(warn, "{}", outcome.message),
                            _ => log_dispatch!(info, "{}", outcome.message),
                        }
                    }
                }
            }

            // プロセスごとのサイクルサマリ行
            let statuses: Vec<&str> = results.iter().map(|r| r.status.label()).collect();
            log_info!(
                LogCategory::Detector,
                "[{}] {} samples={:?} statuses={:?}",
                snapshot.id,
                snapshot.name,
                samples,
                statuses
            );
        }

        // インベントリから消えたプロセスの履歴は保持しない
        let present: Vec<u32> = snapshots.iter().map(|s| s.id).collect();
        let evicted = self.store.retain_present(&present);
        if evicted > 0 {
            log_inventory!(
                debug,
                "Evicted {evicted} entries for processes no longer supervised"
            );
        }
    }

    /// 起動直後に1回実行し、以降は固定間隔で回し続ける
    pub async fn run(&mut self) {
        log_system!(
            info,
            "Regulating supervised processes every {}s",
            self.poll_interval.as_secs()
        );

        // 初回は即時実行
        self.run_cycle().await;

        // サイクルはこのタスク内で完結するため tick と並行実行されることはない
        // サイクルが間隔より長引いた場合、その間の tick は破棄する
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await; // interval の初回 tick は即時発火するため読み捨てる

        loop {
            interval.tick().await;
            self.run_cycle().await;
        }
    }
}
