use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 監視対象プロセスのスナップショット（毎サイクル取得、保持しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    /// PM2 のプロセスID（pm_id）
    pub id: u32,
    pub name: String,
    pub memory_mb: u64,
}

/// 検知ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Low,         // ⚪ 低使用（予約）
    BelowNormal, // 🔵 通常未満（予約）
    Normal,      // 🟢 正常
    AboveNormal, // 🟡 増加傾向
    High,        // 🔴 スパイク検知
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl HealthStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Low => "⚪",
            Self::BelowNormal => "🔵",
            Self::Normal => "🟢",
            Self::AboveNormal => "🟡",
            Self::High => "🔴",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::BelowNormal => "BELOW_NORMAL",
            Self::Normal => "NORMAL",
            Self::AboveNormal => "ABOVE_NORMAL",
            Self::High => "HIGH",
        }
    }
}

/// 検知器の判定結果（毎サイクル再計算される一時データ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub status: HealthStatus,
    pub message: String,
}

impl DetectionResult {
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Normal,
            message: message.into(),
        }
    }
}

/// アクション実行結果のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Success,
    Failure,
    /// クールダウンで送信を抑止した場合の no-op 記録
    Skipped,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// アクション実行の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Failure,
            message: message.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Skipped,
            message: message.into(),
        }
    }
}

/// 是正アクションの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationKind {
    Stop,
    Restart,
}

impl RemediationKind {
    /// pm2 サブコマンド名
    pub fn as_command(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    /// 結果メッセージ用の過去形
    pub fn as_past_tense(&self) -> &'static str {
        match self {
            Self::Stop => "stopped",
            Self::Restart => "restarted",
        }
    }
}

/// ルールテーブルが発火するアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// 通知チャネルへ送信（クールダウン対象）
    Notify,
    /// 設定された種別でプロセスを是正
    Remediate,
}

/// 通知クールダウンの判定
/// last_notified_at が未設定なら常に送信可
pub fn cooldown_elapsed(
    last_notified_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> bool {
    match last_notified_at {
        Some(last) => now - last >= cooldown,
        None => true,
    }
}
