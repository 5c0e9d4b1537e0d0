// テストフィクスチャとモックコラボレータ
// Note: 統合テスト用共通関数は複数の統合テストファイルから使用されるが、
// Rustコンパイラーは各統合テストを独立してコンパイルするため
// dead_code警告が発生する。実際には使用されているため警告を抑制。

#![cfg(test)]
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use fleetguard_daemon::executor::RemediationExecutor;
use fleetguard_daemon::inventory::InventorySource;
use fleetguard_daemon::notifier::NotificationSink;
use fleetguard_daemon::regulator::Regulator;
use fleetguard_shared::config::MonitorSettings;
use fleetguard_shared::{ProcessSnapshot, RemediationKind};

/// テスト用のプロセススナップショットを作成
pub fn snapshot(id: u32, name: &str, memory_mb: u64) -> ProcessSnapshot {
    ProcessSnapshot {
        id,
        name: name.to_string(),
        memory_mb,
    }
}

/// 一意なテストIDを生成
pub fn generate_test_id() -> String {
    format!("test_{}", uuid::Uuid::new_v4())
}

/// テスト用の監視設定（クールダウンはウィンドウ1周分 = 150秒）
pub fn test_monitor_settings() -> MonitorSettings {
    MonitorSettings {
        poll_interval_secs: 30,
        window_capacity: 5,
        spike_threshold_mb: 200,
        trend_threshold: 0.5,
        cooldown_secs: None,
        remediation: RemediationKind::Restart,
    }
}

/// 返すプロセス一覧を差し替えられるインベントリ
pub struct ScriptedInventory {
    processes: Mutex<Vec<ProcessSnapshot>>,
    fail: Mutex<bool>,
}

impl ScriptedInventory {
    pub fn new(processes: Vec<ProcessSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            processes: Mutex::new(processes),
            fail: Mutex::new(false),
        })
    }

    /// 次サイクル以降に返すプロセス一覧を差し替え
    pub fn set_processes(&self, processes: Vec<ProcessSnapshot>) {
        *self.processes.lock().unwrap() = processes;
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl InventorySource for ScriptedInventory {
    async fn list_processes(&self) -> Result<Vec<ProcessSnapshot>> {
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("pm2 unavailable"));
        }
        Ok(self.processes.lock().unwrap().clone())
    }
}

/// 送信内容と呼び出し順を記録する通知シンク
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    fail: Mutex<bool>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new(calls: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
            calls,
        })
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(&self, content: &str) -> Result<()> {
        self.calls.lock().unwrap().push("notify".to_string());
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("channel unavailable"));
        }
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }
}

/// 是正呼び出しを記録する実行器
pub struct RecordingExecutor {
    pub remediated: Mutex<Vec<(u32, RemediationKind)>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new(calls: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            remediated: Mutex::new(Vec::new()),
            calls,
        })
    }

    pub fn remediation_count(&self) -> usize {
        self.remediated.lock().unwrap().len()
    }
}

#[async_trait]
impl RemediationExecutor for RecordingExecutor {
    async fn remediate(&self, id: u32, kind: RemediationKind) -> Result<()> {
        self.calls.lock().unwrap().push("remediate".to_string());
        self.remediated.lock().unwrap().push((id, kind));
        Ok(())
    }
}

/// Regulator とモック一式を組み立てる
pub fn build_regulator(
    settings: &MonitorSettings,
    processes: Vec<ProcessSnapshot>,
) -> (
    Regulator,
    Arc<ScriptedInventory>,
    Arc<RecordingNotifier>,
    Arc<RecordingExecutor>,
    Arc<Mutex<Vec<String>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let inventory = ScriptedInventory::new(processes);
    let notifier = RecordingNotifier::new(calls.clone());
    let executor = RecordingExecutor::new(calls.clone());

    let regulator = Regulator::new(
        settings,
        inventory.clone(),
        notifier.clone(),
        executor.clone(),
    );

    (regulator, inventory, notifier, executor, calls)
}
