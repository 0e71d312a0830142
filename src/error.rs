use thiserror::Error;

/// 生成失敗時にユーザーへ表示する既定メッセージ
pub const MSG_GENERIC_FAILURE: &str = "Failed to generate quiz. Please ensure the content is clear.";
/// APIキー関連の失敗時に表示するメッセージ
pub const MSG_INVALID_API_KEY: &str = "Invalid or missing API Key. Please check your settings.";

/// ファイル選択時の検証エラー
///
/// `Display` がそのままユーザー向けメッセージになる。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please select a valid video file.")]
    InvalidVideoType,
    #[error("Please select a valid document (PDF, DOCX, PAGES).")]
    InvalidDocumentType,
    #[error("File is too large. Please upload a video smaller than {limit_mb}MB for this demo.")]
    VideoTooLarge { limit_mb: u64 },
    #[error("File is too large. Please upload a document smaller than {limit_mb}MB.")]
    DocumentTooLarge { limit_mb: u64 },
    #[error("Failed to read file.")]
    ReadFailed,
}

/// クイズ生成の失敗
///
/// 一時的な失敗と恒久的な失敗は区別しない。リトライもしない。
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API Key is missing. Please add it in settings or configure the environment.")]
    MissingApiKey,
    #[error("Gemini API リクエスト失敗: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini API エラー: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("No response text generated")]
    EmptyResponse,
    #[error("生成結果のパースに失敗: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No quizzes were generated. Please try a different file.")]
    NoQuizzes,
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl GenerationError {
    /// 画面表示用の固定メッセージに変換
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Upload(e) => e.to_string(),
            GenerationError::MissingApiKey => MSG_INVALID_API_KEY.to_string(),
            GenerationError::Api { status, body }
                if matches!(status, 400 | 401 | 403)
                    && (body.contains("API key") || body.contains("API Key")) =>
            {
                MSG_INVALID_API_KEY.to_string()
            }
            _ => MSG_GENERIC_FAILURE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_maps_to_api_key_message() {
        assert_eq!(GenerationError::MissingApiKey.user_message(), MSG_INVALID_API_KEY);
    }

    #[test]
    fn test_api_key_rejection_maps_to_api_key_message() {
        let err = GenerationError::Api {
            status: 400,
            body: r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#.to_string(),
        };
        assert_eq!(err.user_message(), MSG_INVALID_API_KEY);
    }

    #[test]
    fn test_other_failures_are_generic() {
        let err = GenerationError::Api {
            status: 500,
            body: "internal".to_string(),
        };
        assert_eq!(err.user_message(), MSG_GENERIC_FAILURE);
        assert_eq!(GenerationError::EmptyResponse.user_message(), MSG_GENERIC_FAILURE);

        // サーバーエラーは本文に API key とあっても汎用メッセージ
        let err = GenerationError::Api {
            status: 503,
            body: "API key service unavailable".to_string(),
        };
        assert_eq!(err.user_message(), MSG_GENERIC_FAILURE);
        assert_eq!(GenerationError::NoQuizzes.user_message(), MSG_GENERIC_FAILURE);
    }

    #[test]
    fn test_upload_error_message_passes_through() {
        let err = GenerationError::from(UploadError::VideoTooLarge { limit_mb: 20 });
        assert_eq!(
            err.user_message(),
            "File is too large. Please upload a video smaller than 20MB for this demo."
        );
    }
}
