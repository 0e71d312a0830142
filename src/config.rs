use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Gemini API 設定
///
/// # デフォルト値
///
/// - `api_key`: なし (保存済みキー → 環境変数 `GEMINI_API_KEY` / `API_KEY` の順に探す)
/// - `model`: "gemini-3-flash-preview"
/// - `base_url`: "https://generativelanguage.googleapis.com"
/// - `timeout_seconds`: 300 秒
#[derive(Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

// api_key をログに出さない
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// ローカル保存先の設定
///
/// # デフォルト値
///
/// - `data_dir`: "./lunawell-data"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// アップロード制限
///
/// # デフォルト値
///
/// - `video_max_mb`: 20 MB
/// - `document_max_mb`: 10 MB
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_video_max_mb")]
    pub video_max_mb: u64,
    #[serde(default = "default_document_max_mb")]
    pub document_max_mb: u64,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `log_level`: "info"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_data_dir() -> String {
    "./lunawell-data".to_string()
}

fn default_video_max_mb() -> u64 {
    20
}

fn default_document_max_mb() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            video_max_mb: default_video_max_mb(),
            document_max_mb: default_document_max_mb(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// APIキーの先頭6文字以外を伏せる
pub fn mask_api_key(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{}****", prefix)
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use lunawell::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 環境変数から API キーを探す
    pub fn env_api_key() -> Option<String> {
        ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-3-flash-preview");
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.timeout_seconds, 300);
        assert_eq!(config.upload.video_max_mb, 20);
        assert_eq!(config.upload.document_max_mb, 10);
        assert_eq!(config.storage.data_dir, "./lunawell-data");
        assert_eq!(config.output.log_level, "info");
    }

    #[test]
    fn test_write_and_read_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        Config::write_default(path).unwrap();

        let config = Config::from_file(path).unwrap();
        assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.upload.video_max_mb, 20);
    }

    #[test]
    fn test_custom_config() {
        let toml_content = r#"
[gemini]
api_key = "AIzaTestKey123"
model = "gemini-2.0-flash"
base_url = "http://localhost:8080"
timeout_seconds = 30

[storage]
data_dir = "/tmp/lunawell"

[upload]
video_max_mb = 50
document_max_mb = 5

[output]
log_level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.gemini.api_key.as_deref(), Some("AIzaTestKey123"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.base_url, "http://localhost:8080");
        assert_eq!(config.gemini.timeout_seconds, 30);
        assert_eq!(config.storage.data_dir, "/tmp/lunawell");
        assert_eq!(config.upload.video_max_mb, 50);
        assert_eq!(config.upload.document_max_mb, 5);
        assert_eq!(config.output.log_level, "debug");
    }

    #[test]
    fn test_load_or_default_nonexistent() {
        let config = Config::load_or_default("nonexistent_file.toml").unwrap();
        assert_eq!(config.gemini.model, "gemini-3-flash-preview");
    }

    #[test]
    fn test_load_or_default_malformed_is_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[gemini\nmodel = ").unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_partial_config() {
        // 一部の設定のみ記述した場合、残りはデフォルト値が使われる
        let toml_content = r#"
[upload]
video_max_mb = 40
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.upload.video_max_mb, 40);
        assert_eq!(config.upload.document_max_mb, 10);
        assert_eq!(config.gemini.model, "gemini-3-flash-preview");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = GeminiConfig {
            api_key: Some("AIzaSecretValue".to_string()),
            ..GeminiConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("AIzaSe****"));
        assert!(!debug.contains("SecretValue"));
    }
}
