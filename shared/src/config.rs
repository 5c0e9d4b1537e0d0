use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol::RemediationKind;

/// メインの設定構造体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct Config {
    /// 監視・検知設定
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// PM2 連携設定
    #[serde(default)]
    pub pm2: Pm2Settings,

    /// ClickUp 通知設定
    #[serde(default)]
    pub clickup: ClickUpSettings,

    /// ログ設定
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// 監視・検知関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// ポーリング間隔（秒）
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// プロセスごとに保持するサンプル数（スライディングウィンドウ容量）
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// スパイク判定のしきい値（ウィンドウ内 max-min、MB）
    #[serde(default = "default_spike_threshold_mb")]
    pub spike_threshold_mb: u64,

    /// 増加傾向判定のしきい値（最古サンプル比の増加率）
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f64,

    /// 通知クールダウン（秒）。未指定なら window_capacity × poll_interval_secs
    pub cooldown_secs: Option<u64>,

    /// HIGH 検知時の是正種別（"stop" または "restart"）
    #[serde(default = "default_remediation")]
    pub remediation: RemediationKind,
}

/// PM2 関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pm2Settings {
    /// pm2 実行バイナリ
    #[serde(default = "default_pm2_bin")]
    pub bin: String,

    /// pm2 コマンドのタイムアウト（秒）
    #[serde(default = "default_pm2_timeout_secs")]
    pub command_timeout_secs: u64,
}

/// ClickUp 関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickUpSettings {
    /// API トークン（環境変数 CLICKUP_API_KEY で上書き可）
    #[serde(default)]
    pub api_token: String,

    /// 送信先ワークスペースID
    #[serde(default)]
    pub workspace_id: String,

    /// 送信先チャンネルID
    #[serde(default)]
    pub channel_id: String,

    /// HTTP リクエストのタイムアウト（秒）
    #[serde(default = "default_clickup_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// ログ関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct LoggingSettings {
    /// 詳細ログを有効にするか
    #[serde(default)]
    pub verbose: bool,

    /// ログファイルのパス（未指定なら標準エラー出力）
    pub log_file: Option<PathBuf>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            window_capacity: default_window_capacity(),
            spike_threshold_mb: default_spike_threshold_mb(),
            trend_threshold: default_trend_threshold(),
            cooldown_secs: None,
            remediation: default_remediation(),
        }
    }
}

impl Default for Pm2Settings {
    fn default() -> Self {
        Self {
            bin: default_pm2_bin(),
            command_timeout_secs: default_pm2_timeout_secs(),
        }
    }
}

impl Default for ClickUpSettings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            workspace_id: String::new(),
            channel_id: String::new(),
            request_timeout_secs: default_clickup_timeout_secs(),
        }
    }
}

// デフォルト値関数
fn default_poll_interval_secs() -> u64 {
    30
}

fn default_window_capacity() -> usize {
    5
}

fn default_spike_threshold_mb() -> u64 {
    200
}

fn default_trend_threshold() -> f64 {
    0.5
}

fn default_remediation() -> RemediationKind {
    RemediationKind::Restart
}

fn default_pm2_bin() -> String {
    "pm2".to_string()
}

fn default_pm2_timeout_secs() -> u64 {
    30
}

fn default_clickup_timeout_secs() -> u64 {
    10
}

impl MonitorSettings {
    /// ポーリング間隔
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    /// 通知クールダウン。未指定ならウィンドウ1周分（容量 × ポーリング間隔）
    pub fn cooldown_window(&self) -> chrono::Duration {
        let secs = self
            .cooldown_secs
            .unwrap_or(self.poll_interval_secs * self.window_capacity as u64);
        chrono::Duration::seconds(secs as i64)
    }
}

impl Config {
    /// 設定ファイルから読み込み
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// 設定ファイルに保存
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        // ディレクトリが存在しない場合は作成
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// デフォルトの設定ファイルパスを取得
    pub fn default_config_path() -> Result<PathBuf> {
        let home_dir = home::home_dir().context("Failed to get home directory")?;

        Ok(home_dir.join(".fleetguard").join("config.toml"))
    }

    /// 設定ファイルパスの候補を取得（優先順位順）
    pub fn config_path_candidates() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. カレントディレクトリの .fleetguard/config.toml
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join(".fleetguard").join("config.toml"));
        }

        // 2. ホームディレクトリの .fleetguard/config.toml
        if let Some(home_dir) = home::home_dir() {
            paths.push(home_dir.join(".fleetguard").join("config.toml"));
        }

        // 3. XDG規格に従った設定ディレクトリ（Linux/Unix）
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(
                PathBuf::from(xdg_config_home)
                    .join("fleetguard")
                    .join("config.toml"),
            );
        } else if let Some(home_dir) = home::home_dir() {
            paths.push(
                home_dir
                    .join(".config")
                    .join("fleetguard")
                    .join("config.toml"),
            );
        }

        paths
    }

    /// 設定ファイルを自動検出して読み込み
    pub fn load_auto() -> Result<Option<(Self, PathBuf)>> {
        for path in Self::config_path_candidates() {
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }
        Ok(None)
    }

    /// 環境変数で設定を上書き
    pub fn apply_env_overrides(&mut self) {
        // ClickUp 資格情報（元実装と同じ環境変数名）
        if let Ok(token) = std::env::var("CLICKUP_API_KEY") {
            self.clickup.api_token = token;
        }

        if let Ok(workspace_id) = std::env::var("CLICKUP_WORKSPACE_ID") {
            self.clickup.workspace_id = workspace_id;
        }

        if let Ok(channel_id) = std::env::var("CLICKUP_CHANNEL_ID") {
            self.clickup.channel_id = channel_id;
        }

        // ログ設定
        if let Ok(verbose) = std::env::var("FLEETGUARD_VERBOSE") {
            self.logging.verbose = verbose == "1" || verbose.to_lowercase() == "true";
        }

        if let Ok(log_file) = std::env::var("FLEETGUARD_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(log_file));
        }
    }

    /// 設定のサンプルを生成
    pub fn sample() -> Self {
        let mut config = Self::default();

        // サンプル値を設定
        config.monitor.poll_interval_secs = 30;
        config.monitor.window_capacity = 5;
        config.monitor.spike_threshold_mb = 200;
        config.monitor.trend_threshold = 0.5;

        config.clickup.workspace_id = "9001234567".to_string();
        config.clickup.channel_id = "6-901234567890-8".to_string();

        config.logging.verbose = false;
        config.logging.log_file = Some(PathBuf::from("~/.fleetguard/fleetguard.log"));

        config
    }
}
