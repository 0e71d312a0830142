use crate::storage::{LocalStore, KEY_NOTES};
use crate::types::{new_id, now_iso, now_millis, Note};
use anyhow::{Context, Result};

/// 日記
///
/// ノートは新しいものが先頭。変更のたびに全体を保存する。
pub struct Diary {
    store: LocalStore,
    notes: Vec<Note>,
}

impl Diary {
    pub fn load(store: LocalStore) -> Self {
        let notes = store.load_or(KEY_NOTES, Vec::new);
        Self { store, notes }
    }

    fn save(&self) -> Result<()> {
        self.store.set_json(KEY_NOTES, &self.notes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// 空のノートを作成して先頭に追加
    ///
    /// # Arguments
    /// * `title` - 初期タイトル（翻訳済みの "New Note"）
    pub fn new_note(&mut self, title: &str) -> Result<Note> {
        let note = Note {
            id: new_id(),
            title: title.to_string(),
            content: String::new(),
            date: now_iso(),
            last_modified: now_millis(),
        };
        self.add(note.clone())?;
        Ok(note)
    }

    pub fn add(&mut self, note: Note) -> Result<()> {
        self.notes.insert(0, note);
        self.save()
    }

    /// タイトルと本文を更新
    ///
    /// 内容が変わらない場合は保存しない。
    ///
    /// # Returns
    /// 変更があったかどうか
    pub fn update(&mut self, id: &str, title: &str, content: &str) -> Result<bool> {
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .with_context(|| format!("ノートが見つかりません: {}", id))?;

        if note.title == title && note.content == content {
            return Ok(false);
        }
        note.title = title.to_string();
        note.content = content.to_string();
        note.last_modified = now_millis();
        self.save()?;
        Ok(true)
    }

    /// ノートを削除（存在しなければ何もしない）
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.notes.retain(|n| n.id != id);
        self.save()
    }
}
