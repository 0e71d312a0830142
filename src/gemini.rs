use crate::ai_backend::AiBackend;
use crate::config::{mask_api_key, GeminiConfig};
use crate::error::GenerationError;
use crate::types::{ChatMessage, Quiz, QuizGenerationResult, Sender, UsageMetadata};
use crate::upload::EncodedUpload;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const VIDEO_PROMPT: &str = "Analyze this video and generate 1 or 2 quizzes based on the information presented. Each quiz must have exactly 3 to 4 questions. Ensure the questions are accurate to the video content.";
const DOCUMENT_PROMPT: &str = "Analyze this document and generate 1 or 2 quizzes based on the information presented. Each quiz must have exactly 3 to 4 questions. Ensure the questions are accurate to the document content.";

/// 構造化出力のスキーマ（クイズの配列）
pub fn quiz_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "description": "A list of quizzes generated from the content.",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": {
                    "type": "STRING",
                    "description": "A short descriptive title for the quiz."
                },
                "questions": {
                    "type": "ARRAY",
                    "description": "A list of 3 to 4 questions for this quiz.",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "questionText": {
                                "type": "STRING",
                                "description": "The question based on the content."
                            },
                            "options": {
                                "type": "ARRAY",
                                "description": "4 multiple choice options.",
                                "items": { "type": "STRING" }
                            },
                            "correctAnswerIndex": {
                                "type": "INTEGER",
                                "description": "The zero-based index of the correct option."
                            }
                        },
                        "required": ["questionText", "options", "correctAnswerIndex"]
                    }
                }
            },
            "required": ["title", "questions"]
        }
    })
}

/// クイズ生成リクエストの本文を作成
pub fn build_quiz_request(upload: &EncodedUpload) -> Value {
    let prompt = if upload.is_video() {
        VIDEO_PROMPT
    } else {
        DOCUMENT_PROMPT
    };

    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inline_data": {
                        "mime_type": upload.mime_type,
                        "data": upload.base64_data
                    }
                },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": quiz_response_schema()
        }
    })
}

/// チャットリクエストの本文を作成
///
/// Gemini は user/model が交互に並ぶことを要求するため、同じ発言者の連続は1つにまとめる。
pub fn build_chat_request(system_instruction: &str, history: &[ChatMessage], message: &str) -> Value {
    let mut contents: Vec<Value> = Vec::new();
    let mut last_role: Option<&str> = None;

    let turns = history
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .chain(std::iter::once((Sender::User, message)));

    for (sender, text) in turns {
        if text.is_empty() {
            continue;
        }
        let role = match sender {
            Sender::User => "user",
            Sender::Ai => "model",
        };

        if last_role == Some(role) {
            if let Some(parts) = contents
                .last_mut()
                .and_then(|c| c["parts"].as_array_mut())
            {
                parts.push(json!({ "text": text }));
                continue;
            }
        }
        contents.push(json!({ "role": role, "parts": [{ "text": text }] }));
        last_role = Some(role);
    }

    json!({
        "systemInstruction": { "parts": [{ "text": system_instruction }] },
        "contents": contents
    })
}

/// レスポンスから最初の候補のテキストを取り出す
fn response_text(response: &Value) -> Option<String> {
    let parts = response.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// クイズ生成レスポンスを解釈
///
/// 配列として読めれば中身のスキーマ検証はしない。
pub fn parse_quiz_response(response: &Value) -> std::result::Result<QuizGenerationResult, GenerationError> {
    let text = response_text(response).ok_or(GenerationError::EmptyResponse)?;
    let quizzes: Vec<Quiz> = serde_json::from_str(&text)?;

    let usage_metadata = response
        .get("usageMetadata")
        .and_then(|u| serde_json::from_value::<UsageMetadata>(u.clone()).ok());

    Ok(QuizGenerationResult {
        quizzes,
        usage_metadata,
    })
}

/// Gemini API バックエンド
pub struct GeminiBackend {
    config: GeminiConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// # Arguments
    ///
    /// * `config` - モデル名・接続先・タイムアウト
    /// * `api_key` - 解決済みの API キー。`None` の場合は生成時にエラーになる
    pub fn new(config: GeminiConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Gemini API HTTPクライアント作成失敗")?;

        match api_key.as_deref() {
            Some(key) => log::debug!("Gemini API キー: {}", mask_api_key(key)),
            None => log::warn!("Gemini API キーが設定されていません"),
        }

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// generateContent を1回呼び出す
    async fn generate_content(&self, body: &Value) -> std::result::Result<Value, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl AiBackend for GeminiBackend {
    async fn generate_quizzes(
        &self,
        upload: &EncodedUpload,
    ) -> std::result::Result<QuizGenerationResult, GenerationError> {
        log::info!(
            "Gemini API: {} からクイズを生成中 ({})",
            upload.file_name,
            self.config.model
        );
        let body = build_quiz_request(upload);
        let response = self.generate_content(&body).await.map_err(|e| {
            log::error!("Gemini API エラー: {}", e);
            e
        })?;

        let result = parse_quiz_response(&response)?;
        if let Some(usage) = &result.usage_metadata {
            log::debug!("Gemini API: トークン使用量 {}", usage.total_token_count);
        }
        Ok(result)
    }

    async fn chat(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let body = build_chat_request(system_instruction, history, message);
        let response = self.generate_content(&body).await?;
        Ok(response_text(&response).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadKind;

    fn upload(mime: &str) -> EncodedUpload {
        EncodedUpload {
            base64_data: "QUJD".to_string(),
            mime_type: mime.to_string(),
            file_name: "lesson".to_string(),
            kind: if mime.starts_with("video/") {
                UploadKind::Video
            } else {
                UploadKind::Document
            },
        }
    }

    #[test]
    fn test_quiz_request_shape() {
        let body = build_quiz_request(&upload("application/pdf"));

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "application/pdf");
        assert_eq!(parts[0]["inline_data"]["data"], "QUJD");
        assert!(parts[1]["text"].as_str().unwrap().contains("this document"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["items"]["required"],
            json!(["title", "questions"])
        );
    }

    #[test]
    fn test_video_prompt_selected_by_mime() {
        let body = build_quiz_request(&upload("video/mp4"));
        let prompt = body["contents"][0]["parts"][1]["text"].as_str().unwrap();
        assert!(prompt.contains("this video"));
    }

    #[test]
    fn test_parse_quiz_response() {
        let quizzes = r#"[{"title":"Water","questions":[{"questionText":"Q1","options":["a","b","c","d"],"correctAnswerIndex":3}]}]"#;
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": quizzes }] } }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15 }
        });

        let result = parse_quiz_response(&response).unwrap();
        assert_eq!(result.quizzes.len(), 1);
        assert_eq!(result.quizzes[0].questions[0].correct_answer_index, 3);
        assert_eq!(result.usage_metadata.unwrap().total_token_count, 15);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        let empty = json!({ "candidates": [] });
        assert!(matches!(
            parse_quiz_response(&empty),
            Err(GenerationError::EmptyResponse)
        ));

        let malformed = json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        });
        assert!(matches!(
            parse_quiz_response(&malformed),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn test_chat_request_merges_roles() {
        let history = vec![
            ChatMessage {
                id: "1".into(),
                text: "hi".into(),
                sender: Sender::User,
            },
            ChatMessage {
                id: "2".into(),
                text: "again".into(),
                sender: Sender::User,
            },
            ChatMessage {
                id: "3".into(),
                text: "hello".into(),
                sender: Sender::Ai,
            },
        ];
        let body = build_chat_request("be kind", &history, "tips?");

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be kind");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "tips?");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let backend = GeminiBackend::new(GeminiConfig::default(), None).unwrap();
        let err = backend
            .generate_quizzes(&upload("application/pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
        assert!(err.to_string().contains("API Key"));
    }
}
