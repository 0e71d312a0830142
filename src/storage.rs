use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const KEY_QUIZ_HISTORY: &str = "quiz_history";
pub const KEY_NOTES: &str = "ls_notes";
pub const KEY_THEME: &str = "ls_theme";
pub const KEY_LANGUAGE: &str = "ls_lang";
pub const KEY_CONTENT: &str = "ls_content";
pub const KEY_NOTIFICATIONS: &str = "ls_notifications";
pub const KEY_POINTS: &str = "points_earned";
pub const KEY_API_KEY: &str = "user_gemini_api_key";

/// キー単位のローカルストア
///
/// 1キー = `<data_dir>/<key>.json` の1ファイル。
/// 書き込みは値全体の上書きのみで、後勝ち。ロックやバージョン管理はしない。
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// ストアを開く（ディレクトリがなければ作成）
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("データディレクトリの作成に失敗: {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// 生の文字列値を取得（キーがなければ `None`）
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("ストアの読み込みに失敗: {:?}", path))?;
        Ok(Some(content))
    }

    /// 生の文字列値を保存
    pub fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("ストアの書き込みに失敗: {:?}", path))?;
        log::debug!("ストア更新: {} ({} バイト)", key, value.len());
        Ok(())
    }

    /// JSON値を取得
    ///
    /// # Errors
    ///
    /// ファイルは存在するが JSON として読めない場合にエラーを返す。
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_string(key)? {
            Some(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("ストアのパースに失敗: {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// JSON値を保存
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)
            .with_context(|| format!("シリアライズに失敗: {}", key))?;
        self.set_string(key, &content)
    }

    /// JSON値を取得し、なければ（または壊れていれば）デフォルトを返す
    ///
    /// 壊れたデータは退避してからデフォルトを返す。
    /// 次の書き込みで元データが失われることはない。
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: impl FnOnce() -> T) -> T {
        match self.get_json(key) {
            Ok(Some(value)) => value,
            Ok(None) => default(),
            Err(e) => {
                log::warn!("{} の読み込みに失敗しました。初期値を使用します: {:#}", key, e);
                self.quarantine_or_log(key);
                default()
            }
        }
    }

    /// 読めない値を `<key>.corrupt-<ミリ秒>.json` に移す
    ///
    /// # Returns
    /// 退避先のパス
    pub fn quarantine(&self, key: &str) -> Result<PathBuf> {
        let path = self.path_for(key);
        let backup = self
            .dir
            .join(format!("{}.corrupt-{}.json", key, crate::types::now_millis()));
        fs::rename(&path, &backup)
            .with_context(|| format!("壊れたデータの退避に失敗: {:?}", path))?;
        log::warn!("壊れたデータを退避しました: {:?}", backup);
        Ok(backup)
    }

    /// 退避を試み、失敗してもログだけ残す
    pub fn quarantine_or_log(&self, key: &str) {
        if let Err(e) = self.quarantine(key) {
            log::error!("{:#}", e);
        }
    }

    /// キーを削除
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("ストアの削除に失敗: {:?}", path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert!(store.get_string("nothing").unwrap().is_none());
        assert!(store.get_json::<Vec<String>>("nothing").unwrap().is_none());
    }

    #[test]
    fn test_json_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.set_json("list", &vec![1, 2, 3]).unwrap();
        store.set_json("list", &vec![9]).unwrap();

        let value: Vec<i32> = store.get_json("list").unwrap().unwrap();
        assert_eq!(value, vec![9]);
        assert!(dir.path().join("list.json").exists());
    }

    #[test]
    fn test_open_creates_nested_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LocalStore::open(&nested).unwrap();
        store.set_string(KEY_LANGUAGE, "fr").unwrap();
        assert_eq!(store.get_string(KEY_LANGUAGE).unwrap().as_deref(), Some("fr"));
    }

    #[test]
    fn test_load_or_falls_back_on_corrupt_data() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.set_string("broken", "{not json").unwrap();

        let value: Vec<i32> = store.load_or("broken", || vec![42]);
        assert_eq!(value, vec![42]);

        // 元データは退避され、キーは空になる
        assert!(store.get_string("broken").unwrap().is_none());
        store.set_json("broken", &vec![1]).unwrap();
        let backup = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().starts_with("broken.corrupt-"))
            .unwrap();
        assert_eq!(std::fs::read_to_string(backup.path()).unwrap(), "{not json");
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.set_string(KEY_API_KEY, "abc").unwrap();
        store.remove(KEY_API_KEY).unwrap();
        assert!(store.get_string(KEY_API_KEY).unwrap().is_none());
        // 存在しないキーの削除はエラーにならない
        store.remove(KEY_API_KEY).unwrap();
    }
}
