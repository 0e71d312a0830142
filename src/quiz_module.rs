use crate::ai_backend::AiBackend;
use crate::error::{GenerationError, MSG_GENERIC_FAILURE};
use crate::history::QuizHistory;
use crate::results::{token_usage_percent, PointsLedger, TOKEN_CONTEXT_LIMIT};
use crate::types::{PointsData, Quiz, QuizState, UsageMetadata};
use crate::upload::EncodedUpload;
use anyhow::{Context, Result};
use std::sync::Arc;

/// 「マイクイズ」で受験中のクイズ
#[derive(Clone, Debug)]
pub struct ActiveQuiz {
    pub quiz: Quiz,
    pub history_id: String,
    pub quiz_index: usize,
    pub complete: bool,
    pub score: u32,
    pub total: u32,
}

/// クイズ生成から受験・編集までの画面遷移
///
/// ```text
/// Upload → Processing → Quiz → Results → (retake) Quiz
///              ↓                   ↓ (reset)
///            Error ──(reset)──→ Upload ⇄ Edit
/// ```
pub struct QuizModule {
    backend: Arc<dyn AiBackend>,
    history: QuizHistory,
    points: PointsLedger,
    state: QuizState,
    quizzes: Vec<Quiz>,
    final_score: u32,
    total_questions: u32,
    error_message: Option<String>,
    token_usage: Option<UsageMetadata>,
    editing: Option<(String, usize)>,
    active: Option<ActiveQuiz>,
}

impl QuizModule {
    pub fn new(backend: Arc<dyn AiBackend>, history: QuizHistory, points: PointsLedger) -> Self {
        Self {
            backend,
            history,
            points,
            state: QuizState::Upload,
            quizzes: Vec::new(),
            final_score: 0,
            total_questions: 0,
            error_message: None,
            token_usage: None,
            editing: None,
            active: None,
        }
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn history(&self) -> &QuizHistory {
        &self.history
    }

    /// 直近に生成したクイズ
    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn final_score(&self) -> (u32, u32) {
        (self.final_score, self.total_questions)
    }

    pub fn token_usage(&self) -> Option<UsageMetadata> {
        self.token_usage
    }

    /// 直近の生成で使ったトークンのコンテキスト上限に対する割合
    pub fn token_usage_percent(&self) -> Option<f64> {
        self.token_usage
            .map(|u| token_usage_percent(u.total_token_count, TOKEN_CONTEXT_LIMIT))
    }

    pub fn active(&self) -> Option<&ActiveQuiz> {
        self.active.as_ref()
    }

    pub fn points(&self) -> &PointsLedger {
        &self.points
    }

    /// アップロードされたファイルからクイズを生成して履歴に追加
    ///
    /// 成功すれば `Quiz`、失敗すれば `Error` に遷移する。
    /// 失敗時のメッセージは `error_message` で取得できる。
    pub async fn handle_upload(&mut self, upload: &EncodedUpload) -> QuizState {
        self.state = QuizState::Processing;
        self.error_message = None;
        self.token_usage = None;

        match self.generate(upload).await {
            Ok(quizzes) => {
                self.quizzes = quizzes;
                self.state = QuizState::Quiz;
            }
            Err(message) => {
                self.error_message = Some(message);
                self.state = QuizState::Error;
            }
        }
        self.state
    }

    async fn generate(&mut self, upload: &EncodedUpload) -> std::result::Result<Vec<Quiz>, String> {
        let result = self.backend.generate_quizzes(upload).await.map_err(|e| {
            log::error!("クイズ生成に失敗: {}", e);
            e.user_message()
        })?;

        if let Some(usage) = result.usage_metadata {
            self.token_usage = Some(usage);
        }
        if result.quizzes.is_empty() {
            return Err(GenerationError::NoQuizzes.user_message());
        }

        self.history
            .add_generated(&upload.file_name, result.quizzes.clone())
            .map_err(|e| {
                log::error!("履歴の保存に失敗: {:#}", e);
                MSG_GENERIC_FAILURE.to_string()
            })?;
        Ok(result.quizzes)
    }

    /// 生成直後のクイズを解き終えた
    pub fn complete(&mut self, score: u32, total: u32) -> Result<PointsData> {
        self.final_score = score;
        self.total_questions = total;
        self.state = QuizState::Results;
        self.points.award(score)
    }

    pub fn retake(&mut self) {
        self.final_score = 0;
        self.state = QuizState::Quiz;
    }

    /// 最初の画面に戻る
    pub fn reset(&mut self) {
        self.state = QuizState::Upload;
        self.quizzes.clear();
        self.final_score = 0;
        self.total_questions = 0;
        self.error_message = None;
    }

    /// 編集を開始
    ///
    /// # Returns
    /// 編集対象のクイズ（複製）
    pub fn begin_edit(&mut self, history_id: &str, quiz_index: usize) -> Result<Quiz> {
        let quiz = self
            .history
            .get_quiz(history_id, quiz_index)
            .cloned()
            .with_context(|| format!("編集するクイズが見つかりません: {} #{}", history_id, quiz_index))?;
        self.editing = Some((history_id.to_string(), quiz_index));
        self.state = QuizState::Edit;
        Ok(quiz)
    }

    pub fn save_edit(&mut self, quiz: Quiz) -> Result<()> {
        let (history_id, quiz_index) = self
            .editing
            .take()
            .context("編集中のクイズがありません")?;
        self.history.update_quiz(&history_id, quiz_index, quiz)?;
        self.state = QuizState::Upload;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.state = QuizState::Upload;
    }

    /// 履歴からクイズを削除
    ///
    /// 受験中のクイズが同じ履歴項目に属していれば閉じる。
    pub fn delete_quiz(&mut self, history_id: &str, quiz_index: usize) -> Result<()> {
        self.history.delete_quiz(history_id, quiz_index)?;
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.history_id == history_id)
        {
            self.active = None;
        }
        Ok(())
    }

    /// 履歴のクイズを受験する
    pub fn take_quiz(&mut self, history_id: &str, quiz_index: usize) -> Result<&ActiveQuiz> {
        let quiz = self
            .history
            .get_quiz(history_id, quiz_index)
            .cloned()
            .with_context(|| format!("クイズが見つかりません: {} #{}", history_id, quiz_index))?;
        let active = self.active.insert(ActiveQuiz {
            quiz,
            history_id: history_id.to_string(),
            quiz_index,
            complete: false,
            score: 0,
            total: 0,
        });
        Ok(&*active)
    }

    /// 受験したクイズを解き終えた
    ///
    /// 統計とポイントの両方に反映する。
    pub fn complete_taken(&mut self, score: u32, total: u32) -> Result<Option<PointsData>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        active.complete = true;
        active.score = score;
        active.total = total;

        let (history_id, quiz_index) = (active.history_id.clone(), active.quiz_index);
        let stats = self.history.record_attempt(&history_id, quiz_index, score)?;
        if let Some(active) = self.active.as_mut() {
            active.quiz.stats = Some(stats);
        }
        self.points.award(score).map(Some)
    }

    pub fn retake_taken(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.complete = false;
            active.score = 0;
        }
    }

    pub fn close_taken(&mut self) {
        self.active = None;
    }
}
