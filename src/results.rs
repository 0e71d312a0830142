use crate::storage::{LocalStore, KEY_POINTS};
use crate::types::{now_iso, PointsData};
use anyhow::Result;
use serde_json::Value;

/// トークン使用率の計算に使うコンテキスト上限
pub const TOKEN_CONTEXT_LIMIT: u64 = 1_000_000;

/// 正答率（%、四捨五入）
///
/// 問題数が0の場合は0を返す。
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (score as f64 / total as f64 * 100.0).round() as u32
}

/// トークン使用率（%、小数点以下2桁）
pub fn token_usage_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    (used as f64 / limit as f64 * 10000.0).round() / 100.0
}

/// 累積ポイントの記録
///
/// クイズ履歴の統計とは独立に加算するだけで、突き合わせはしない。
pub struct PointsLedger {
    store: LocalStore,
}

impl PointsLedger {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 現在の累積ポイント
    ///
    /// 保存値がない、または数値として読めない場合は0。
    /// 小数は切り捨て、負の値は0として扱う。
    pub fn total(&self) -> u64 {
        match self.store.get_json::<Value>(KEY_POINTS) {
            Ok(Some(value)) => value
                .get("totalPoints")
                .and_then(Value::as_f64)
                .filter(|points| points.is_finite() && *points > 0.0)
                .map(|points| points.trunc() as u64)
                .unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                log::warn!("ポイントの読み込みに失敗: {:#}", e);
                0
            }
        }
    }

    /// ポイントを加算して保存
    pub fn award(&self, score: u32) -> Result<PointsData> {
        let data = PointsData {
            total_points: self.total() + u64::from(score),
            last_updated: now_iso(),
        };
        self.store.set_json(KEY_POINTS, &data)?;
        log::info!("ポイント加算: +{} (合計 {})", score, data.total_points);
        Ok(data)
    }
}
