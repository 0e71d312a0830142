use crate::error::GenerationError;
use crate::types::{ChatMessage, QuizGenerationResult};
use crate::upload::EncodedUpload;
use anyhow::Result;
use async_trait::async_trait;

/// 生成AIバックエンドの共通トレイト
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// アップロードされたファイルからクイズを生成
    ///
    /// 1回のリクエストのみ。タイムアウト以外の打ち切りやリトライはしない。
    async fn generate_quizzes(
        &self,
        upload: &EncodedUpload,
    ) -> std::result::Result<QuizGenerationResult, GenerationError>;

    /// 会話履歴を踏まえてチャットの返答を取得
    ///
    /// # Arguments
    /// * `system_instruction` - アシスタントの振る舞いを指定する指示文
    /// * `history` - これまでのやり取り（古い順）
    /// * `message` - 今回のユーザー発言
    async fn chat(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String>;
}
