use chrono::{DateTime, Utc};
use std::sync::Arc;

use fleetguard_shared::{
    cooldown_elapsed, ActionKind, ActionResult, DetectionResult, ProcessSnapshot, RemediationKind,
};

use crate::executor::RemediationExecutor;
use crate::notifier::NotificationSink;
use crate::rules::RuleTable;
use crate::store::MonitorEntry;

/// ルールテーブルに従ってアクションを順に実行するディスパッチャ
/// 個々のアクション失敗はサイクルを止めず、結果として集約される
pub struct Dispatcher {
    rules: RuleTable,
    notifier: Arc<dyn NotificationSink>,
    executor: Arc<dyn RemediationExecutor>,
    remediation: RemediationKind,
    cooldown: chrono::Duration,
}

impl Dispatcher {
    pub fn new(
        rules: RuleTable,
        notifier: Arc<dyn NotificationSink>,
        executor: Arc<dyn RemediationExecutor>,
        remediation: RemediationKind,
        cooldown: chrono::Duration,
    ) -> Self {
        Self {
            rules,
            notifier,
            executor,
            remediation,
            cooldown,
        }
    }

    /// 1プロセス × 1検知結果ぶんのアクションを順に実行して結果を返す
    /// now はテストから注入できるよう引数で受ける
    pub async fn dispatch(
        &self,
        snapshot: &ProcessSnapshot,
        result: &DetectionResult,
        entry: &mut MonitorEntry,
        now: DateTime<Utc>,
    ) -> Vec<ActionResult> {
        let actions = self.rules.actions_for(result.status);

        // 正常系はここで即終了。副作用もログも出さない
        if actions.is_empty() {
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let outcome = match action {
                ActionKind::Notify => self.notify(snapshot, result, entry, now).await,
                ActionKind::Remediate => self.remediate(snapshot).await,
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// 通知アクション。プロセス単位のクールダウンで再通知を抑止する
    async fn notify(
        &self,
        snapshot: &ProcessSnapshot,
        result: &DetectionResult,
        entry: &mut MonitorEntry,
        now: DateTime<Utc>,
    ) -> ActionResult {
        if !cooldown_elapsed(entry.last_notified_at, now, self.cooldown) {
            return ActionResult::skipped(format!(
                "notification for {} suppressed (cooldown)",
                snapshot.name
            ));
        }

        let content = format!("🔎 {}\n{}", snapshot.name, result.message);

        match self.notifier.send(&content).await {
            Ok(()) => {
                // 送信に成功したときだけクールダウンを開始する
                // 失敗時は last_notified_at を据え置き、次サイクルで再試行させる
                entry.last_notified_at = Some(now);
                ActionResult::success(format!("notified channel about {}", snapshot.name))
            }
            Err(e) => ActionResult::failure(format!(
                "failed to notify channel about {}: {e:#}",
                snapshot.name
            )),
        }
    }

    /// 是正アクション。通知クールダウンの影響は受けない
    async fn remediate(&self, snapshot: &ProcessSnapshot) -> ActionResult {
        match self.executor.remediate(snapshot.id, self.remediation).await {
            Ok(()) => ActionResult::success(format!(
                "✅ PM2 process {} was {}",
                snapshot.name,
                self.remediation.as_past_tense()
            )),
            Err(e) => ActionResult::failure(format!(
                "❌ failed to {} PM2 process {}: {e:#}",
                self.remediation.as_command(),
                snapshot.name
            )),
        }
    }
}
