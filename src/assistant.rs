use crate::ai_backend::AiBackend;
use crate::types::{new_id, ChatMessage, ContentItem, Language, Sender};
use std::sync::Arc;

pub const GREETING: &str = "Hello! How can I help you today with your wellness journey?";
const EMPTY_REPLY: &str = "I'm sorry, I couldn't understand that gently.";
const CONNECTION_ERROR_REPLY: &str =
    "I am having a moment of silence (connection error). Please try again.";

/// コンテンツ一覧と言語からシステム指示文を作る
pub fn build_system_instruction(content: &[ContentItem], language: Language) -> String {
    let content_context = content
        .iter()
        .map(|item| {
            format!(
                "- Title: {} ({})\n  Description: {}",
                item.title,
                item.content_type.as_str(),
                item.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a helpful, gentle, and knowledgeable wellness assistant for a women's wellbeing website called \"lunawell\".\n\
         Your tone should be calm, supportive, and focused on beauty, simplicity, and well-being.\n\
         \n\
         The user is speaking in {}. Please reply in the same language.\n\
         \n\
         Here is the list of curated Videos and Classes available on the platform:\n\
         {}\n\
         \n\
         If the user asks questions about the content, refer to these items specifically.\n\
         If the user asks general wellness advice, provide simple, scientifically backed, and kind advice.\n\
         Keep answers concise but warm.",
        language.code(),
        content_context
    )
}

/// アシスタントとの会話セッション
///
/// 失敗しても例外にはせず、固定の返答を表示用の会話に残す。
/// API に送る履歴には成功したやり取りだけを積む。
pub struct ChatSession {
    backend: Arc<dyn AiBackend>,
    system_instruction: String,
    messages: Vec<ChatMessage>,
    api_history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn AiBackend>, content: &[ContentItem], language: Language) -> Self {
        Self {
            backend,
            system_instruction: build_system_instruction(content, language),
            messages: vec![ChatMessage {
                id: "0".to_string(),
                text: GREETING.to_string(),
                sender: Sender::Ai,
            }],
            api_history: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// メッセージを送信して返答を得る
    ///
    /// 空白のみの入力は無視して `None` を返す。
    pub async fn send(&mut self, input: &str) -> Option<String> {
        if input.trim().is_empty() {
            return None;
        }

        // 挨拶とフォールバックの返答は API には送らない
        let result = self
            .backend
            .chat(&self.system_instruction, &self.api_history, input)
            .await;

        let user_message = ChatMessage {
            id: new_id(),
            text: input.to_string(),
            sender: Sender::User,
        };
        let reply = match result {
            Ok(text) if !text.trim().is_empty() => {
                let ai_message = ChatMessage {
                    id: new_id(),
                    text: text.clone(),
                    sender: Sender::Ai,
                };
                self.api_history.push(user_message.clone());
                self.api_history.push(ai_message);
                text
            }
            Ok(_) => EMPTY_REPLY.to_string(),
            Err(e) => {
                log::error!("Gemini チャットエラー: {:#}", e);
                CONNECTION_ERROR_REPLY.to_string()
            }
        };

        self.messages.push(user_message);
        self.messages.push(ChatMessage {
            id: new_id(),
            text: reply.clone(),
            sender: Sender::Ai,
        });
        Some(reply)
    }
}
