use fleetguard_shared::{ActionKind, HealthStatus};
use std::collections::HashMap;

/// ステータス → アクション列のルールテーブル
/// 分岐ロジックではなくデータとして持ち、順序も含めて差し替え可能にする
pub struct RuleTable {
    rules: HashMap<HealthStatus, Vec<ActionKind>>,
}

impl RuleTable {
    pub fn new(rules: HashMap<HealthStatus, Vec<ActionKind>>) -> Self {
        Self { rules }
    }

    /// ステータスに対応するアクション列（登録がなければ空）
    pub fn actions_for(&self, status: HealthStatus) -> &[ActionKind] {
        self.rules.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let mut rules = HashMap::new();

        // 通知を先に試行してから是正する。是正が失敗しても運用者には届いている
        rules.insert(
            HealthStatus::High,
            vec![ActionKind::Notify, ActionKind::Remediate],
        );
        rules.insert(HealthStatus::AboveNormal, vec![ActionKind::Notify]);

        Self { rules }
    }
}
