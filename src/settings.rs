use crate::config::Config;
use crate::storage::{LocalStore, KEY_API_KEY, KEY_LANGUAGE, KEY_THEME};
use crate::types::{Language, ThemeSettings};
use anyhow::{bail, Result};

/// 翻訳テーブル
///
/// 未登録のキーはキー自体を返す。
pub fn translate(language: Language, key: &str) -> &str {
    let text = match (language, key) {
        (Language::En, "title") => "lunawell - Demo",
        (Language::En, "myAssistant") => "My Assistant",
        (Language::En, "dashboard") => "Dashboard - Demo",
        (Language::En, "options") => "Options",
        (Language::En, "diary") => "Diary",
        (Language::En, "notifications") => "Notifications",
        (Language::En, "content") => "Videos & Classes Demo",
        (Language::En, "chat") => "Chat",
        (Language::En, "welcome") => "Welcome to your sanctuary of simplicity and beauty.",
        (Language::En, "save") => "Save",
        (Language::En, "delete") => "Delete",
        (Language::En, "addNotification") => "Add Reminder",
        (Language::En, "addContent") => "Add Content",
        (Language::En, "language") => "Language",
        (Language::En, "textColor") => "Text Color",
        (Language::En, "bgColor") => "Background Color",
        (Language::En, "typeMessage") => "Type a message...",
        (Language::En, "diaryPlaceholder") => "Dear Diary...",
        (Language::En, "newNote") => "New Note",
        (Language::En, "saved") => "Saved",
        (Language::En, "chatPlaceholder") => "Ask about our classes or wellness tips...",
        (Language::En, "infoDashboard") => "Embed a video or document by choosing the appropriate option in the content section. In the full version, you will have access to personalized wellness content, and more.",
        (Language::En, "infoQuizzes") => "Add a document or a learn video to create your first quiz. Switch to the \"Courses\" tab to view and add content.",

        (Language::De, "title") => "lunawell - Demo",
        (Language::De, "myAssistant") => "Meine Assistentin",
        (Language::De, "dashboard") => "Dashboard - Demo",
        (Language::De, "options") => "Optionen",
        (Language::De, "diary") => "Tagebuch",
        (Language::De, "notifications") => "Benachrichtigungen",
        (Language::De, "content") => "Videos & Kurse Demo",
        (Language::De, "chat") => "Chat",
        (Language::De, "welcome") => "Willkommen in Ihrem Sanktuarium der Einfachheit und Schönheit.",
        (Language::De, "save") => "Speichern",
        (Language::De, "delete") => "Löschen",
        (Language::De, "addNotification") => "Erinnerung hinzufügen",
        (Language::De, "addContent") => "Inhalt hinzufügen",
        (Language::De, "language") => "Sprache",
        (Language::De, "textColor") => "Textfarbe",
        (Language::De, "bgColor") => "Hintergrundfarbe",
        (Language::De, "typeMessage") => "Nachricht eingeben...",
        (Language::De, "diaryPlaceholder") => "Liebes Tagebuch...",
        (Language::De, "newNote") => "Neue Notiz",
        (Language::De, "saved") => "Gespeichert",
        (Language::De, "chatPlaceholder") => "Fragen Sie nach unseren Kursen oder Wellness-Tipps...",
        (Language::De, "infoDashboard") => "Fügen Sie ein Video oder Dokument hinzu, indem Sie die entsprechende Option im Inhaltsbereich auswählen. In der Vollversion haben Sie Zugriff auf personalisierte Wellness-Inhalte und mehr.",
        (Language::De, "infoQuizzes") => "Fügen Sie ein Dokument oder ein Lernvideo hinzu, um Ihr erstes Quiz zu erstellen. Wechseln Sie zur Registerkarte \"Kurse\", um Inhalte anzuzeigen und hinzuzufügen.",

        (Language::Fr, "title") => "lunawell - Demo",
        (Language::Fr, "myAssistant") => "Mon Assistante",
        (Language::Fr, "dashboard") => "Tableau de Bord - Démo",
        (Language::Fr, "options") => "Options",
        (Language::Fr, "diary") => "Journal",
        (Language::Fr, "notifications") => "Notifications",
        (Language::Fr, "content") => "Vidéos & Cours Demo",
        (Language::Fr, "chat") => "Discussion",
        (Language::Fr, "welcome") => "Bienvenue dans votre sanctuaire de simplicité et de beauté.",
        (Language::Fr, "save") => "Enregistrer",
        (Language::Fr, "delete") => "Supprimer",
        (Language::Fr, "addNotification") => "Ajouter un rappel",
        (Language::Fr, "addContent") => "Ajouter du contenu",
        (Language::Fr, "language") => "Langue",
        (Language::Fr, "textColor") => "Couleur du texte",
        (Language::Fr, "bgColor") => "Couleur de fond",
        (Language::Fr, "typeMessage") => "Tapez un message...",
        (Language::Fr, "diaryPlaceholder") => "Cher journal...",
        (Language::Fr, "newNote") => "Nouvelle note",
        (Language::Fr, "saved") => "Enregistré",
        (Language::Fr, "chatPlaceholder") => "Posez des questions sur nos cours ou astuces bien-être...",
        (Language::Fr, "infoDashboard") => "Intégrez une vidéo ou un document en choisissant l'option appropriée dans la section contenu. Dans la version complète, vous aurez accès à du contenu de bien-être personnalisé, et plus encore.",
        (Language::Fr, "infoQuizzes") => "Ajoutez un document ou une vidéo d'apprentissage pour créer votre premier quiz. Passez à l'onglet \"Cours\" pour voir et ajouter du contenu.",

        _ => return key,
    };
    text
}

/// `#RRGGBB` 形式かどうか
fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// 言語・テーマ・API キーの設定
pub struct Settings {
    store: LocalStore,
}

impl Settings {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 保存された言語（未設定・不明な値は英語）
    pub fn language(&self) -> Language {
        match self.store.get_string(KEY_LANGUAGE) {
            Ok(Some(code)) => Language::parse(&code).unwrap_or_default(),
            Ok(None) => Language::default(),
            Err(e) => {
                log::warn!("言語設定の読み込みに失敗: {:#}", e);
                Language::default()
            }
        }
    }

    pub fn set_language(&self, language: Language) -> Result<()> {
        self.store.set_string(KEY_LANGUAGE, language.code())
    }

    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(self.language(), key)
    }

    pub fn theme(&self) -> ThemeSettings {
        self.store.load_or(KEY_THEME, ThemeSettings::default)
    }

    /// テーマを保存
    ///
    /// # Errors
    ///
    /// 色が `#RRGGBB` 形式でない場合にエラーを返す。
    pub fn set_theme(&self, theme: &ThemeSettings) -> Result<()> {
        for color in [&theme.text_color, &theme.background_color] {
            if !is_hex_color(color) {
                bail!("色の形式が不正です（#RRGGBB）: {}", color);
            }
        }
        self.store.set_json(KEY_THEME, theme)
    }

    /// ユーザーが保存した API キー
    pub fn user_api_key(&self) -> Option<String> {
        self.store
            .get_string(KEY_API_KEY)
            .ok()
            .flatten()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// API キーを保存（空文字なら削除して既定のキーに戻す）
    pub fn set_user_api_key(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            self.store.remove(KEY_API_KEY)
        } else {
            self.store.set_string(KEY_API_KEY, key)
        }
    }

    /// 実際に使う API キーを決める
    ///
    /// 保存済みキー → 設定ファイル → 環境変数 の順。
    pub fn resolve_api_key(&self, config: &Config) -> Option<String> {
        self.user_api_key()
            .or_else(|| {
                config
                    .gemini
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
            })
            .or_else(Config::env_api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings::new(LocalStore::open(dir.path()).unwrap())
    }

    #[test]
    fn test_translate_fallback_to_key() {
        assert_eq!(translate(Language::De, "newNote"), "Neue Notiz");
        assert_eq!(translate(Language::Fr, "unknownKey"), "unknownKey");
    }

    #[test]
    fn test_every_language_has_full_table() {
        let keys = [
            "dashboard",
            "options",
            "typeMessage",
            "diaryPlaceholder",
            "chatPlaceholder",
            "infoDashboard",
            "infoQuizzes",
        ];
        for language in [Language::En, Language::De, Language::Fr] {
            for key in keys {
                assert_ne!(translate(language, key), key, "{:?} {}", language, key);
            }
        }
        assert_eq!(translate(Language::Fr, "dashboard"), "Tableau de Bord - Démo");
        assert!(translate(Language::En, "infoQuizzes").ends_with("to view and add content."));
    }

    #[test]
    fn test_language_round_trip_and_unknown() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        assert_eq!(s.language(), Language::En);

        s.set_language(Language::Fr).unwrap();
        assert_eq!(s.language(), Language::Fr);
        assert_eq!(s.t("save"), "Enregistrer");

        s.store.set_string(KEY_LANGUAGE, "xx").unwrap();
        assert_eq!(s.language(), Language::En);
    }

    #[test]
    fn test_theme_validation() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        assert_eq!(s.theme(), ThemeSettings::default());

        let bad = ThemeSettings {
            text_color: "red".to_string(),
            background_color: "#FFFFFF".to_string(),
        };
        assert!(s.set_theme(&bad).is_err());

        let good = ThemeSettings {
            text_color: "#000000".to_string(),
            background_color: "#ffeedd".to_string(),
        };
        s.set_theme(&good).unwrap();
        assert_eq!(s.theme(), good);
    }

    #[test]
    fn test_user_key_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let mut config = Config::default();
        config.gemini.api_key = Some("from-config".to_string());

        assert_eq!(s.resolve_api_key(&config).as_deref(), Some("from-config"));

        s.set_user_api_key("  from-user ").unwrap();
        assert_eq!(s.resolve_api_key(&config).as_deref(), Some("from-user"));

        // 空文字で保存済みキーを消す
        s.set_user_api_key("").unwrap();
        assert!(s.user_api_key().is_none());
    }

    // 環境変数を触るテストはこの1つだけにする
    #[test]
    fn test_env_fallback_order() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let config = Config::default();

        std::env::set_var("GEMINI_API_KEY", "  ");
        std::env::set_var("API_KEY", "from-api-key");
        assert_eq!(s.resolve_api_key(&config).as_deref(), Some("from-api-key"));

        std::env::set_var("GEMINI_API_KEY", "from-gemini");
        assert_eq!(s.resolve_api_key(&config).as_deref(), Some("from-gemini"));

        let mut with_config = Config::default();
        with_config.gemini.api_key = Some("from-config".to_string());
        assert_eq!(s.resolve_api_key(&with_config).as_deref(), Some("from-config"));

        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("API_KEY");
        assert!(s.resolve_api_key(&config).is_none());
    }
}
