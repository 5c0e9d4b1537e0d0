use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

use fleetguard_shared::config::Pm2Settings;
use fleetguard_shared::RemediationKind;

/// プロセス是正の実行器
/// サイクル内での自動リトライはしない。失敗は報告され、対応は次サイクル以降
#[async_trait]
pub trait RemediationExecutor: Send + Sync {
    async fn remediate(&self, id: u32, kind: RemediationKind) -> Result<()>;
}

/// pm2 CLI を介した是正（stop / restart）
pub struct Pm2Executor {
    bin: String,
    timeout: Duration,
}

impl Pm2Executor {
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
impl RemediationExecutor for Pm2Executor {
    async fn remediate(&self, id: u32, kind: RemediationKind) -> Result<()> {
        let subcommand = kind.as_command();

        // サイクルを無期限に止めないため必ずタイムアウトを掛ける
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.bin)
                .arg(subcommand)
                .arg(id.to_string())
                .output(),
        )
        .await
        .with_context(|| format!("'pm2 {subcommand} {id}' timed out"))?
        .with_context(|| format!("Failed to run 'pm2 {subcommand} {id}'"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "'pm2 {subcommand} {id}' exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}
