use crate::config::UploadConfig;
use crate::error::UploadError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;

const MB: u64 = 1024 * 1024;

const DOCUMENT_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/x-iwork-pages-sffpages",
    "application/msword",
];

const DOCUMENT_EXTENSIONS: [&str; 4] = [".pdf", ".docx", ".pages", ".doc"];

/// アップロードの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    Video,
    Document,
}

/// 生成APIに渡す準備ができたファイル
#[derive(Clone, Debug)]
pub struct EncodedUpload {
    /// base64エンコード済みの内容（Data URL接頭辞なし）
    pub base64_data: String,
    pub mime_type: String,
    pub file_name: String,
    pub kind: UploadKind,
}

impl EncodedUpload {
    pub fn is_video(&self) -> bool {
        self.kind == UploadKind::Video
    }
}

/// 拡張子から MIME タイプを推定
///
/// 不明な拡張子は `None`。
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "pages" => "application/x-iwork-pages-sffpages",
        _ => return None,
    };
    Some(mime)
}

/// 動画ファイルとして受け付けられるか検証
pub fn validate_video(mime_type: &str, size: u64, limits: &UploadConfig) -> Result<(), UploadError> {
    if !mime_type.starts_with("video/") {
        return Err(UploadError::InvalidVideoType);
    }
    if size > limits.video_max_mb * MB {
        return Err(UploadError::VideoTooLarge {
            limit_mb: limits.video_max_mb,
        });
    }
    Ok(())
}

/// 文書ファイルとして受け付けられるか検証
///
/// MIME タイプが一覧になくても、拡張子が一致すれば受け付ける。
pub fn validate_document(
    file_name: &str,
    mime_type: &str,
    size: u64,
    limits: &UploadConfig,
) -> Result<(), UploadError> {
    let lower = file_name.to_ascii_lowercase();
    let has_valid_extension = DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));

    if !DOCUMENT_MIME_TYPES.contains(&mime_type) && !has_valid_extension {
        return Err(UploadError::InvalidDocumentType);
    }
    if size > limits.document_max_mb * MB {
        return Err(UploadError::DocumentTooLarge {
            limit_mb: limits.document_max_mb,
        });
    }
    Ok(())
}

/// ファイルを検証して base64 に変換
///
/// 種類は MIME タイプから判定し、`video/*` 以外は文書として扱う。
pub fn prepare_upload<P: AsRef<Path>>(path: P, limits: &UploadConfig) -> Result<EncodedUpload, UploadError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let detected = mime_from_path(path);

    let size = fs::metadata(path)
        .map_err(|e| {
            log::error!("ファイル情報の取得に失敗: {:?} - {}", path, e);
            UploadError::ReadFailed
        })?
        .len();

    let (kind, mime_type) = match detected {
        Some(mime) if mime.starts_with("video/") => {
            validate_video(mime, size, limits)?;
            (UploadKind::Video, mime.to_string())
        }
        other => {
            let mime = other.unwrap_or("");
            validate_document(&file_name, mime, size, limits)?;
            // 種類不明の文書は PDF として送る
            let mime = if mime.is_empty() { "application/pdf" } else { mime };
            (UploadKind::Document, mime.to_string())
        }
    };

    let bytes = fs::read(path).map_err(|e| {
        log::error!("ファイルの読み込みに失敗: {:?} - {}", path, e);
        UploadError::ReadFailed
    })?;

    log::info!(
        "アップロード準備完了: {} ({}, {} バイト)",
        file_name,
        mime_type,
        bytes.len()
    );

    Ok(EncodedUpload {
        base64_data: STANDARD.encode(&bytes),
        mime_type,
        file_name,
        kind,
    })
}
