use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;

use fleetguard_shared::config::Pm2Settings;
use fleetguard_shared::ProcessSnapshot;

/// プロセス一覧の取得元
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_processes(&self) -> Result<Vec<ProcessSnapshot>>;
}

/// pm2 jlist の出力から必要な項目だけを読む
#[derive(Debug, Deserialize)]
struct Pm2Record {
    pm_id: u32,
    name: String,
    monit: Pm2Monit,
}

#[derive(Debug, Deserialize)]
struct Pm2Monit {
    memory: u64,
}

/// バイト → MB（四捨五入）
fn to_mb(bytes: u64) -> u64 {
    (bytes as f64 / 1024.0 / 1024.0).round() as u64
}

/// pm2 jlist 出力のパース
/// pm2 はデーモン起動メッセージ等を JSON 配列の前に出すことがあるため、
/// 先頭の '[' から読み始める
pub fn parse_jlist(stdout: &str) -> Result<Vec<ProcessSnapshot>> {
    let json_start = stdout
        .find('[')
        .ok_or_else(|| anyhow!("No JSON array found in 'pm2 jlist' output"))?;

    let records: Vec<Pm2Record> = serde_json::from_str(&stdout[json_start..])
        .context("Failed to parse 'pm2 jlist' output")?;

    Ok(records
        .into_iter()
        .map(|record| ProcessSnapshot {
            id: record.pm_id,
            name: record.name,
            memory_mb: to_mb(record.monit.memory),
        })
        .collect())
}

/// pm2 CLI を介したインベントリ取得
pub struct Pm2Inventory {
    bin: String,
    timeout: Duration,
}

impl Pm2Inventory {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Pm2Settings) -> Self {
        Self::new(
            settings.bin.clone(),
            Duration::from_secs(settings.command_timeout_secs),
        )
    }
}

#[async_trait]
impl InventorySource for Pm2Inventory {
    async fn list_processes(&self) -> Result<Vec<ProcessSnapshot>> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.bin).arg("jlist").output(),
        )
        .await
        .context("'pm2 jlist' timed out")?
        .context("Failed to run 'pm2 jlist'")?;

        if !output.status.success() {
            return Err(anyhow!("'pm2 jlist' exited with {}", output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_jlist(&stdout)
    }
}
