use serde::{Deserialize, Serialize};

/// 現在時刻のエポックミリ秒
///
/// ID生成と `lastModified` の両方に使う。
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 現在時刻をミリ秒文字列のIDとして返す
///
/// 同一ミリ秒内に作成すると衝突するが、重複検出は行わない。
pub fn new_id() -> String {
    now_millis().to_string()
}

/// ISO 8601形式の現在時刻（ミリ秒精度, UTC）
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// 表示言語
///
/// # Examples
///
/// ```
/// # use lunawell::types::Language;
/// assert_eq!(Language::parse("de"), Some(Language::De));
/// assert_eq!(Language::parse("ja"), None);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
}

impl Language {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "de" => Some(Language::De),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
        }
    }
}

/// 日記のノート
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// 作成日時 (ISO 8601)
    pub date: String,
    /// 最終更新 (エポックミリ秒)
    pub last_modified: i64,
}

/// 通知・リマインダー
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// システム通知かユーザーが追加したリマインダーか
    pub is_system: bool,
    pub date: String,
}

/// コンテンツの種類
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Class,
    Document,
}

impl ContentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => Some(ContentType::Video),
            "class" => Some(ContentType::Class),
            "document" => Some(ContentType::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Class => "class",
            ContentType::Document => "document",
        }
    }
}

/// コンテンツライブラリの項目
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub url: String,
}

/// 画面のテーマ設定
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub text_color: String,
    pub background_color: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            text_color: "#4A4A4A".to_string(),
            background_color: "#FAF9F6".to_string(),
        }
    }
}

/// 4択問題
///
/// `correct_answer_index` が `options` の範囲内かは検証しない。
/// 範囲外の場合はどの選択肢を選んでも不正解になる。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
}

impl Question {
    /// 選択肢が正解かどうか
    pub fn is_correct(&self, option_index: usize) -> bool {
        i64::try_from(option_index)
            .map(|idx| idx == self.correct_answer_index)
            .unwrap_or(false)
    }
}

/// クイズの受験統計
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub times_taken: u32,
    pub total_score: u32,
}

/// クイズ
///
/// # JSON例
///
/// ```json
/// {
///   "title": "Hydration Basics",
///   "questions": [
///     {
///       "questionText": "How much water per day?",
///       "options": ["1L", "2L", "5L", "10L"],
///       "correctAnswerIndex": 1
///     }
///   ],
///   "stats": { "timesTaken": 2, "totalScore": 5 }
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<QuizStats>,
}

/// アップロード1回分の生成結果
///
/// 履歴の永続化単位。クイズが0件になった項目は履歴から消える。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub source_name: String,
    pub quizzes: Vec<Quiz>,
    pub timestamp: String,
}

/// 累積ポイント
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PointsData {
    pub total_points: u64,
    pub last_updated: String,
}

/// 生成APIが返すトークン使用量
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

/// クイズ生成の結果
#[derive(Clone, Debug)]
pub struct QuizGenerationResult {
    pub quizzes: Vec<Quiz>,
    pub usage_metadata: Option<UsageMetadata>,
}

/// クイズ画面の状態
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizState {
    Upload,
    Processing,
    Quiz,
    Results,
    Error,
    Edit,
}

/// チャットの発言者
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

/// チャットメッセージ
#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
}
