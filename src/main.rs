use anyhow::{bail, Context, Result};
use env_logger::Env;
use lunawell::{
    assistant::ChatSession,
    config::{mask_api_key, Config},
    content_library::ContentLibrary,
    diary::Diary,
    error::MSG_GENERIC_FAILURE,
    gemini::GeminiBackend,
    history::QuizHistory,
    notifications::Notifications,
    quiz_module::QuizModule,
    quiz_player::QuizPlayer,
    results::{percentage, PointsLedger, TOKEN_CONTEXT_LIMIT},
    settings::Settings,
    storage::LocalStore,
    tui::{PlayOutcome, ResultsAction, TuiApp},
    types::{ContentType, Language, Quiz, QuizState, ThemeSettings},
    upload::prepare_upload,
};
use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

const USAGE: &str = "\
使い方: lunawell [--config <path>] <command> [args...]

  --generate-config [path]          デフォルト設定ファイルを生成
  generate <file>                   動画・資料からクイズを生成して受験
  history                           クイズ履歴を表示
  take <id> <index>                 履歴のクイズを受験
  edit <id> <index> <json-file>     クイズを JSON ファイルの内容で置き換え
  delete <id> <index>               クイズを削除
  points                            累積ポイントを表示
  diary list|new [title]|show <id>|edit <id> <title> [content|-]|delete <id>
  notify list|add <message>
  content list|add <video|class|document> <title> <description> <url>
  chat                              アシスタントと会話
  settings show|language <en|de|fr>|theme <text> <background>|api-key [key]";

/// コマンド実行に必要な共有状態
struct App {
    config: Config,
    store: LocalStore,
    settings: Settings,
}

impl App {
    fn backend(&self) -> Result<Arc<GeminiBackend>> {
        let api_key = self.settings.resolve_api_key(&self.config);
        Ok(Arc::new(GeminiBackend::new(self.config.gemini.clone(), api_key)?))
    }

    fn quiz_module(&self) -> Result<QuizModule> {
        Ok(QuizModule::new(
            self.backend()?,
            QuizHistory::load(self.store.clone()),
            PointsLedger::new(self.store.clone()),
        ))
    }
}

/// `--name value` を引数列から取り除いて値を返す
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} には値が必要です", name);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("引数 <{}> が必要です\n\n{}", name, USAGE))
}

fn index_arg(args: &[String], index: usize) -> Result<usize> {
    let raw = arg(args, index, "index")?;
    raw.parse()
        .with_context(|| format!("index は0以上の整数で指定してください: {}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    // コマンドライン引数をパース
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // 設定ファイル生成モード
    if args.first().map(String::as_str) == Some("--generate-config") {
        let config_path = args.get(1).map(String::as_str).unwrap_or("config.toml");
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = take_option(&mut args, "--config")?.unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_or_default(&config_path)?;

    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or(config.output.log_level.as_str()))
        .format_timestamp(None)
        .init();

    log::debug!("設定: {:?}", config);

    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let store = LocalStore::open(&config.storage.data_dir)?;
    log::debug!("データディレクトリ: {:?}", store.dir());
    let app = App {
        settings: Settings::new(store.clone()),
        store,
        config,
    };

    match command.as_str() {
        "generate" => cmd_generate(&app, arg(rest, 0, "file")?).await,
        "history" => cmd_history(&app),
        "take" => cmd_take(&app, arg(rest, 0, "id")?, index_arg(rest, 1)?),
        "edit" => cmd_edit(&app, arg(rest, 0, "id")?, index_arg(rest, 1)?, arg(rest, 2, "json-file")?),
        "delete" => {
            let (id, index) = (arg(rest, 0, "id")?, index_arg(rest, 1)?);
            app.quiz_module()?.delete_quiz(id, index)?;
            println!("削除しました: {} #{}", id, index);
            Ok(())
        }
        "points" => {
            println!("Total Points Stored: {}", PointsLedger::new(app.store.clone()).total());
            Ok(())
        }
        "diary" => cmd_diary(&app, rest),
        "notify" => cmd_notify(&app, rest),
        "content" => cmd_content(&app, rest),
        "chat" => cmd_chat(&app).await,
        "settings" => cmd_settings(&app, rest),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("不明なコマンドです: {}\n\n{}", other, USAGE),
    }
}

async fn cmd_generate(app: &App, path: &str) -> Result<()> {
    let upload = prepare_upload(path, &app.config.upload)?;
    let mut module = app.quiz_module()?;

    log::info!("クイズを生成しています: {} ({})", upload.file_name, upload.mime_type);
    println!(
        "{} を解析しています。数分かかる場合があります...",
        if upload.is_video() { "Analyzing video" } else { "Analyzing document" }
    );

    if module.handle_upload(&upload).await == QuizState::Error {
        bail!("{}", module.error_message().unwrap_or(MSG_GENERIC_FAILURE));
    }

    if let (Some(usage), Some(pct)) = (module.token_usage(), module.token_usage_percent()) {
        println!(
            "Token usage: {} / {} ({:.2}%)",
            usage.total_token_count, TOKEN_CONTEXT_LIMIT, pct
        );
    }
    println!("{} 件のクイズを生成しました", module.quizzes().len());

    let mut player = QuizPlayer::new(module.quizzes().to_vec())?;
    let mut tui = TuiApp::new()?;
    let outcome = play_generated(&mut tui, &mut module, &mut player);
    tui.restore()?;
    outcome
}

fn play_generated(tui: &mut TuiApp, module: &mut QuizModule, player: &mut QuizPlayer) -> Result<()> {
    loop {
        let (score, total) = match tui.play(player)? {
            PlayOutcome::Completed { score, total } => (score, total),
            PlayOutcome::Aborted => return Ok(()),
        };
        let points = module.complete(score, total)?;
        match tui.show_results(score, total, points.total_points, "Upload New File")? {
            ResultsAction::Retake => {
                module.retake();
                player.retake();
            }
            ResultsAction::Close => {
                module.reset();
                return Ok(());
            }
        }
    }
}

fn cmd_history(app: &App) -> Result<()> {
    let history = QuizHistory::load(app.store.clone());
    if history.is_empty() {
        println!("{}", app.settings.t("infoQuizzes"));
        return Ok(());
    }

    for item in history.items() {
        println!("{}  {}  ({})", item.id, item.source_name, item.timestamp);
        for (index, quiz) in item.quizzes.iter().enumerate() {
            let stats = match quiz.stats {
                Some(stats) if stats.times_taken > 0 => format!(
                    "taken {}x, avg {:.1}",
                    stats.times_taken,
                    f64::from(stats.total_score) / f64::from(stats.times_taken)
                ),
                _ => "not taken".to_string(),
            };
            println!(
                "  #{} {} - {} questions, {}",
                index,
                quiz.title,
                quiz.questions.len(),
                stats
            );
        }
    }
    Ok(())
}

fn cmd_take(app: &App, history_id: &str, quiz_index: usize) -> Result<()> {
    let mut module = app.quiz_module()?;
    let quiz = module.take_quiz(history_id, quiz_index)?.quiz.clone();
    let mut player = QuizPlayer::new(vec![quiz])?;

    let mut tui = TuiApp::new()?;
    let outcome = play_taken(&mut tui, &mut module, &mut player);
    tui.restore()?;

    if let Some((score, total)) = outcome? {
        println!("{} / {} ({}%)", score, total, percentage(score, total));
    }
    Ok(())
}

fn play_taken(
    tui: &mut TuiApp,
    module: &mut QuizModule,
    player: &mut QuizPlayer,
) -> Result<Option<(u32, u32)>> {
    loop {
        let (score, total) = match tui.play(player)? {
            PlayOutcome::Completed { score, total } => (score, total),
            PlayOutcome::Aborted => {
                module.close_taken();
                return Ok(None);
            }
        };
        let total_points = match module.complete_taken(score, total)? {
            Some(points) => points.total_points,
            None => module.points().total(),
        };
        match tui.show_results(score, total, total_points, "Close Quiz")? {
            ResultsAction::Retake => {
                module.retake_taken();
                player.retake();
            }
            ResultsAction::Close => {
                module.close_taken();
                return Ok(Some((score, total)));
            }
        }
    }
}

fn cmd_edit(app: &App, history_id: &str, quiz_index: usize, json_path: &str) -> Result<()> {
    let mut module = app.quiz_module()?;
    module.begin_edit(history_id, quiz_index)?;

    let parsed = std::fs::read_to_string(json_path)
        .with_context(|| format!("クイズファイルの読み込みに失敗: {}", json_path))
        .and_then(|text| {
            serde_json::from_str::<Quiz>(&text)
                .with_context(|| format!("クイズファイルのパースに失敗: {}", json_path))
        });

    let quiz = match parsed {
        Ok(quiz) => quiz,
        Err(e) => {
            module.cancel_edit();
            return Err(e);
        }
    };
    if quiz.questions.is_empty() {
        module.cancel_edit();
        bail!("問題が1つもありません");
    }

    module.save_edit(quiz)?;
    println!("{}: {} #{}", app.settings.t("saved"), history_id, quiz_index);
    Ok(())
}

fn cmd_diary(app: &App, args: &[String]) -> Result<()> {
    let mut diary = Diary::load(app.store.clone());
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            println!("{}", app.settings.t("diary"));
            for note in diary.notes() {
                println!("  {}  {}  ({})", note.id, note.title, note.date);
            }
        }
        "new" => {
            let default_title = app.settings.t("newNote");
            let title = args.get(1).map(String::as_str).unwrap_or(default_title);
            let note = diary.new_note(title)?;
            println!("{}", note.id);
        }
        "show" => {
            let id = arg(args, 1, "id")?;
            let note = diary
                .get(id)
                .with_context(|| format!("ノートが見つかりません: {}", id))?;
            let body = if note.content.is_empty() {
                app.settings.t("diaryPlaceholder")
            } else {
                note.content.as_str()
            };
            println!("{}\n{}\n\n{}", note.title, note.date, body);
        }
        "edit" => {
            let (id, title) = (arg(args, 1, "id")?, arg(args, 2, "title")?);
            let content = match args.get(3).map(String::as_str) {
                Some("-") => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf).context("標準入力の読み込みに失敗")?;
                    buf
                }
                Some(text) => text.to_string(),
                None => diary.get(id).map(|n| n.content.clone()).unwrap_or_default(),
            };
            if diary.update(id, title, &content)? {
                println!("{}", app.settings.t("saved"));
            }
        }
        "delete" => {
            let id = arg(args, 1, "id")?;
            diary.delete(id)?;
            println!("{}: {}", app.settings.t("delete"), id);
        }
        other => bail!("不明な diary コマンドです: {}", other),
    }
    Ok(())
}

fn cmd_notify(app: &App, args: &[String]) -> Result<()> {
    let mut notifications = Notifications::load(app.store.clone());
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            println!("{}", app.settings.t("notifications"));
            for n in notifications.items() {
                let marker = if n.is_system { "*" } else { "-" };
                println!("  {} {}  ({})", marker, n.message, n.date);
            }
        }
        "add" => {
            let message = args[1..].join(" ");
            notifications.add_reminder(&message)?;
            println!("{}", app.settings.t("addNotification"));
        }
        other => bail!("不明な notify コマンドです: {}", other),
    }
    Ok(())
}

fn cmd_content(app: &App, args: &[String]) -> Result<()> {
    let mut library = ContentLibrary::load(app.store.clone());
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            println!("{}", app.settings.t("content"));
            for item in library.items() {
                println!("  [{}] {}\n      {}\n      {}", item.content_type.as_str(), item.title, item.description, item.url);
            }
        }
        "add" => {
            let raw_type = arg(args, 1, "type")?;
            let content_type = ContentType::parse(raw_type)
                .with_context(|| format!("種類は video / class / document のいずれかです: {}", raw_type))?;
            let item = library.add(
                arg(args, 2, "title")?,
                arg(args, 3, "description")?,
                content_type,
                arg(args, 4, "url")?,
            )?;
            println!("{}: {}", app.settings.t("addContent"), item.title);
        }
        other => bail!("不明な content コマンドです: {}", other),
    }
    Ok(())
}

async fn cmd_chat(app: &App) -> Result<()> {
    let library = ContentLibrary::load(app.store.clone());
    let mut session = ChatSession::new(app.backend()?, library.items(), app.settings.language());

    log::debug!("システム指示:\n{}", session.system_instruction());

    println!("{} ({})", app.settings.t("myAssistant"), app.settings.t("chat"));
    if let Some(greeting) = session.messages().first() {
        println!("AI> {}", greeting.text);
    }
    println!("({})", app.settings.t("chatPlaceholder"));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} > ", app.settings.t("typeMessage"));
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("標準入力の読み込みに失敗")?;
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }
        if let Some(reply) = session.send(&line).await {
            println!("AI> {}", reply);
        }
    }
    Ok(())
}

fn cmd_settings(app: &App, args: &[String]) -> Result<()> {
    let settings = &app.settings;
    match args.first().map(String::as_str).unwrap_or("show") {
        "show" => {
            let theme = settings.theme();
            println!("{}: {}", settings.t("language"), settings.language().code());
            println!("{}: {}", settings.t("textColor"), theme.text_color);
            println!("{}: {}", settings.t("bgColor"), theme.background_color);
            let key = settings
                .resolve_api_key(&app.config)
                .map(|k| mask_api_key(&k))
                .unwrap_or_else(|| "(none)".to_string());
            println!("API key: {}", key);
        }
        "language" => {
            let code = arg(args, 1, "en|de|fr")?;
            let language =
                Language::parse(code).with_context(|| format!("未対応の言語です: {}", code))?;
            settings.set_language(language)?;
            println!("{}: {}", settings.t("language"), language.code());
        }
        "theme" => {
            let theme = ThemeSettings {
                text_color: arg(args, 1, "text")?.to_string(),
                background_color: arg(args, 2, "background")?.to_string(),
            };
            settings.set_theme(&theme)?;
            println!("{}", settings.t("saved"));
        }
        "api-key" => {
            settings.set_user_api_key(args.get(1).map(String::as_str).unwrap_or(""))?;
            println!("{}", settings.t("saved"));
        }
        other => bail!("不明な settings コマンドです: {}", other),
    }
    Ok(())
}
