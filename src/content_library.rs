use crate::storage::{LocalStore, KEY_CONTENT};
use crate::types::{new_id, ContentItem, ContentType};
use anyhow::{bail, Result};

fn initial_content() -> Vec<ContentItem> {
    vec![ContentItem {
        id: "3".to_string(),
        title: "Skin Care Basics".to_string(),
        description: "Understanding your skin type and basic routine.".to_string(),
        content_type: ContentType::Document,
        url: "#".to_string(),
    }]
}

/// 動画・クラス・資料のライブラリ（追加のみ）
pub struct ContentLibrary {
    store: LocalStore,
    items: Vec<ContentItem>,
}

impl ContentLibrary {
    pub fn load(store: LocalStore) -> Self {
        let items = store.load_or(KEY_CONTENT, initial_content);
        Self { store, items }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// 項目を先頭に追加
    ///
    /// # Errors
    ///
    /// タイトル・説明・URL のいずれかが空の場合にエラーを返す。
    pub fn add(
        &mut self,
        title: &str,
        description: &str,
        content_type: ContentType,
        url: &str,
    ) -> Result<ContentItem> {
        for (name, value) in [("title", title), ("description", description), ("url", url)] {
            if value.trim().is_empty() {
                bail!("{} は必須です", name);
            }
        }
        let item = ContentItem {
            id: new_id(),
            title: title.to_string(),
            description: description.to_string(),
            content_type,
            url: url.to_string(),
        };
        self.items.insert(0, item.clone());
        self.store.set_json(KEY_CONTENT, &self.items)?;
        log::info!("コンテンツを追加: {} ({})", item.title, content_type.as_str());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seeded_library() {
        let dir = TempDir::new().unwrap();
        let library = ContentLibrary::load(LocalStore::open(dir.path()).unwrap());
        assert_eq!(library.items().len(), 1);
        assert_eq!(library.items()[0].title, "Skin Care Basics");
    }

    #[test]
    fn test_add_prepends_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut library = ContentLibrary::load(store.clone());

        library
            .add(
                "Morning Yoga Flow",
                "A gentle 15-minute sequence.",
                ContentType::Video,
                "https://www.youtube.com/embed/v7AYKMP6rOE",
            )
            .unwrap();

        let reloaded = ContentLibrary::load(store);
        assert_eq!(reloaded.items().len(), 2);
        assert_eq!(reloaded.items()[0].content_type, ContentType::Video);
    }

    #[test]
    fn test_required_fields() {
        let dir = TempDir::new().unwrap();
        let mut library = ContentLibrary::load(LocalStore::open(dir.path()).unwrap());
        assert!(library.add("", "d", ContentType::Class, "https://x").is_err());
        assert!(library.add("t", "d", ContentType::Class, " ").is_err());
        assert_eq!(library.items().len(), 1);
    }
}
