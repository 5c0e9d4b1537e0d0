use fleetguard_shared::{DetectionResult, HealthStatus};

/// 検知器。現在のウィンドウ（古い順のメモリ読み値、MB）を分類する
/// スパイクと増加傾向は独立に毎サイクル評価される
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, samples: &[u64]) -> DetectionResult;
}

/// スパイク検知器
/// ウィンドウ内の max - min がしきい値を超えたら HIGH
pub struct SpikeDetector {
    threshold_mb: u64,
}

impl SpikeDetector {
    pub fn new(threshold_mb: u64) -> Self {
        Self { threshold_mb }
    }
}

impl Detector for SpikeDetector {
    fn name(&self) -> &'static str {
        "spike"
    }

    fn evaluate(&self, samples: &[u64]) -> DetectionResult {
        let (min, max) = match samples.split_first() {
            Some((&first, rest)) => rest
                .iter()
                .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s))),
            // ストアは空のウィンドウを渡さないが、空なら判定不能として正常扱い
            None => return DetectionResult::normal("no samples yet"),
        };

        let diff = max - min;

        if diff > self.threshold_mb {
            DetectionResult {
                status: HealthStatus::High,
                message: format!("🔊 RAM usage spiked by {diff} MB"),
            }
        } else {
            DetectionResult::normal(format!("no spike (delta {diff} MB)"))
        }
    }
}

/// 増加傾向検知器
/// 最古サンプル比の増加率がしきい値を超えたら ABOVE_NORMAL
pub struct TrendDetector {
    threshold: f64,
}

impl TrendDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detector for TrendDetector {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn evaluate(&self, samples: &[u64]) -> DetectionResult {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return DetectionResult::normal("no samples yet"),
        };

        // ゼロ基準では増加率が定義できない。ゼロ除算にせず正常扱いにする
        if first == 0 {
            return DetectionResult::normal("baseline sample is 0 MB, trend not computable");
        }

        let slope = (last as f64 - first as f64) / first as f64;

        if slope > self.threshold {
            DetectionResult {
                status: HealthStatus::AboveNormal,
                message: format!(
                    "🔊 RAM usage grew {:.1}% over the sampling window ({first} MB to {last} MB)",
                    slope * 100.0
                ),
            }
        } else {
            DetectionResult::normal(format!("no sustained growth ({:+.1}%)", slope * 100.0))
        }
    }
}
