use crate::storage::{LocalStore, KEY_NOTIFICATIONS};
use crate::types::{new_id, now_iso, Notification};
use anyhow::{bail, Result};

/// 初回起動時の通知
fn initial_notifications() -> Vec<Notification> {
    let date = now_iso();
    vec![
        Notification {
            id: "1".to_string(),
            message: "Welcome to your personal wellness space.".to_string(),
            is_system: true,
            date: date.clone(),
        },
        Notification {
            id: "2".to_string(),
            message: "Remember to drink water today!".to_string(),
            is_system: false,
            date,
        },
    ]
}

/// 通知一覧（追加のみ、削除なし）
pub struct Notifications {
    store: LocalStore,
    items: Vec<Notification>,
}

impl Notifications {
    pub fn load(store: LocalStore) -> Self {
        let items = store.load_or(KEY_NOTIFICATIONS, initial_notifications);
        Self { store, items }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// リマインダーを先頭に追加
    ///
    /// # Errors
    ///
    /// メッセージが空白のみの場合にエラーを返す。
    pub fn add_reminder(&mut self, message: &str) -> Result<Notification> {
        if message.trim().is_empty() {
            bail!("リマインダーの内容が空です");
        }
        let notification = Notification {
            id: new_id(),
            message: message.to_string(),
            is_system: false,
            date: now_iso(),
        };
        self.items.insert(0, notification.clone());
        self.store.set_json(KEY_NOTIFICATIONS, &self.items)?;
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seeded_with_initial_messages() {
        let dir = TempDir::new().unwrap();
        let notifications = Notifications::load(LocalStore::open(dir.path()).unwrap());
        let items = notifications.items();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_system);
        assert_eq!(items[1].message, "Remember to drink water today!");
    }

    #[test]
    fn test_add_reminder_prepends_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut notifications = Notifications::load(store.clone());

        let added = notifications.add_reminder("Drink herbal tea at 5 PM").unwrap();
        assert!(!added.is_system);

        let reloaded = Notifications::load(store);
        assert_eq!(reloaded.items().len(), 3);
        assert_eq!(reloaded.items()[0].message, "Drink herbal tea at 5 PM");
    }

    #[test]
    fn test_blank_reminder_rejected() {
        let dir = TempDir::new().unwrap();
        let mut notifications = Notifications::load(LocalStore::open(dir.path()).unwrap());
        assert!(notifications.add_reminder("   ").is_err());
        assert_eq!(notifications.items().len(), 2);
    }
}
