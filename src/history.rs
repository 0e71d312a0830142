use crate::storage::{LocalStore, KEY_QUIZ_HISTORY};
use crate::types::{new_id, now_iso, HistoryItem, Quiz, QuizStats};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// 生成済みクイズの履歴
///
/// 新しい項目ほど先頭。変更のたびに全体を書き戻す。
pub struct QuizHistory {
    store: LocalStore,
    items: Vec<HistoryItem>,
    /// 形式が合わず読めなかった項目（保存時にそのまま書き戻す）
    unreadable: Vec<Value>,
}

/// 旧形式 (`videoName`) の項目を現在の形式に揃える
///
/// `sourceName` → `videoName` → "Unknown File" の順に採用する。
/// 項目ごとに変換し、読めない項目は変換済みの値のまま2つ目に返す。
pub fn migrate_items(raw: Vec<Value>) -> (Vec<HistoryItem>, Vec<Value>) {
    let mut items = Vec::with_capacity(raw.len());
    let mut unreadable = Vec::new();

    for mut item in raw {
        let source_name = item
            .get("sourceName")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                item.get("videoName")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("Unknown File")
            .to_string();
        if let Some(obj) = item.as_object_mut() {
            obj.insert("sourceName".to_string(), Value::String(source_name));
            obj.remove("videoName");
        }

        match HistoryItem::deserialize(&item) {
            Ok(parsed) => items.push(parsed),
            Err(e) => {
                log::warn!(
                    "履歴項目を読み込めません (id: {}): {}",
                    item.get("id").unwrap_or(&Value::Null),
                    e
                );
                unreadable.push(item);
            }
        }
    }
    (items, unreadable)
}

impl QuizHistory {
    /// ストアから履歴を読み込む
    ///
    /// 全体が読めない場合は壊れたファイルを退避して空の履歴で始める。
    pub fn load(store: LocalStore) -> Self {
        let raw = match store.get_json::<Vec<Value>>(KEY_QUIZ_HISTORY) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                log::error!("履歴の読み込みに失敗しました: {:#}", e);
                store.quarantine_or_log(KEY_QUIZ_HISTORY);
                Vec::new()
            }
        };
        let (items, unreadable) = migrate_items(raw);
        log::debug!(
            "履歴 {} 件を読み込みました (読めない項目 {} 件)",
            items.len(),
            unreadable.len()
        );
        Self {
            store,
            items,
            unreadable,
        }
    }

    fn save(&self) -> Result<()> {
        let mut raw = self
            .items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()
            .context("履歴のシリアライズに失敗")?;
        raw.extend(self.unreadable.iter().cloned());
        self.store.set_json(KEY_QUIZ_HISTORY, &raw)
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, history_id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == history_id)
    }

    pub fn get_quiz(&self, history_id: &str, quiz_index: usize) -> Option<&Quiz> {
        self.find(history_id)?.quizzes.get(quiz_index)
    }

    fn quiz_mut(&mut self, history_id: &str, quiz_index: usize) -> Result<&mut Quiz> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == history_id)
            .with_context(|| format!("履歴が見つかりません: {}", history_id))?;
        item.quizzes
            .get_mut(quiz_index)
            .with_context(|| format!("クイズが見つかりません: {} #{}", history_id, quiz_index))
    }

    /// 生成結果を履歴の先頭に追加
    ///
    /// # Returns
    /// 追加した項目の ID
    pub fn add_generated(&mut self, source_name: &str, quizzes: Vec<Quiz>) -> Result<String> {
        if quizzes.is_empty() {
            bail!("No quizzes were generated. Please try a different file.");
        }
        let item = HistoryItem {
            id: new_id(),
            source_name: source_name.to_string(),
            quizzes,
            timestamp: now_iso(),
        };
        let id = item.id.clone();
        log::info!("履歴に追加: {} (クイズ {} 件)", source_name, item.quizzes.len());
        self.items.insert(0, item);
        self.save()?;
        Ok(id)
    }

    /// 編集したクイズで置き換える
    pub fn update_quiz(&mut self, history_id: &str, quiz_index: usize, quiz: Quiz) -> Result<()> {
        *self.quiz_mut(history_id, quiz_index)? = quiz;
        self.save()
    }

    /// クイズを削除
    ///
    /// クイズが残らなくなった項目は履歴から取り除く。
    /// 該当する項目がなければ何もしない。
    pub fn delete_quiz(&mut self, history_id: &str, quiz_index: usize) -> Result<()> {
        for item in self.items.iter_mut().filter(|item| item.id == history_id) {
            if quiz_index < item.quizzes.len() {
                item.quizzes.remove(quiz_index);
            }
        }
        self.items.retain(|item| !item.quizzes.is_empty());
        self.save()
    }

    /// 受験結果を統計に反映
    ///
    /// # Returns
    /// 更新後の統計
    pub fn record_attempt(&mut self, history_id: &str, quiz_index: usize, score: u32) -> Result<QuizStats> {
        let quiz = self.quiz_mut(history_id, quiz_index)?;
        let current = quiz.stats.unwrap_or_default();
        let updated = QuizStats {
            times_taken: current.times_taken + 1,
            total_score: current.total_score + score,
        };
        quiz.stats = Some(updated);
        self.save()?;
        Ok(updated)
    }
}
