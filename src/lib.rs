//! lunawell - ウェルネス学習用のクイズ生成・日記・アシスタント
//!
//! アップロードした学習動画や資料から Gemini API で4択クイズを生成し、
//! ターミナル上で受験・採点・ポイント管理を行う。
//! 日記、リマインダー、コンテンツライブラリ、チャットアシスタントも提供する。
//!
//! # アーキテクチャ
//!
//! ```text
//! [File] → [upload] → [QuizModule] ──→ [AiBackend (Gemini)]
//!                          │                    │
//!                          ↓                    ↓
//!                    [QuizHistory]      [QuizGenerationResult]
//!                          │
//!                          ↓
//!                  [QuizPlayer + TUI] → [PointsLedger]
//!
//! [Diary] [Notifications] [ContentLibrary] [Settings]
//!                  └──────────┬──────────┘
//!                        [LocalStore]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use lunawell::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod ai_backend;
pub mod assistant;
pub mod config;
pub mod content_library;
pub mod diary;
pub mod error;
pub mod gemini;
pub mod history;
pub mod notifications;
pub mod quiz_module;
pub mod quiz_player;
pub mod results;
pub mod settings;
pub mod storage;
pub mod tui;
pub mod types;
pub mod upload;
