use crate::quiz_player::{PlayerStep, QuizPlayer};
use crate::results::percentage;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;

/// キー入力から解釈した操作
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Select(usize),
    Up,
    Down,
    Advance,
    Retake,
    Quit,
    Suspend,
}

/// キーを操作に変換
///
/// 数字キーは1始まりで選択肢に対応する。
pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Suspend),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('r') => Some(Command::Retake),
        KeyCode::Char(c @ '1'..='9') => Some(Command::Select(c as usize - '1' as usize)),
        KeyCode::Up | KeyCode::Char('k') => Some(Command::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Command::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Command::Advance),
        _ => None,
    }
}

/// 受験の結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Completed { score: u32, total: u32 },
    Aborted,
}

/// 結果画面での選択
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultsAction {
    Retake,
    Close,
}

/// クイズ受験用のTUI
pub struct TuiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TuiApp {
    /// ターミナルを初期化
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// ターミナルをリストア
    pub fn restore(mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        // まずターミナルをリストア
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            let _ = signal::raise(Signal::SIGTSTP);
        }

        // 再開後にターミナルを再初期化
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.terminal.clear()?;
        Ok(())
    }

    fn next_command(&mut self) -> Result<Option<Command>> {
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                return Ok(map_key(key));
            }
        }
        Ok(None)
    }

    /// クイズを最後まで解く
    pub fn play(&mut self, player: &mut QuizPlayer) -> Result<PlayOutcome> {
        let mut cursor: usize = 0;

        loop {
            self.terminal.draw(|f| draw_player(f, player, cursor))?;

            let Some(command) = self.next_command()? else {
                continue;
            };
            let option_count = player.current_question().options.len();

            match command {
                Command::Quit => return Ok(PlayOutcome::Aborted),
                Command::Suspend => self.suspend()?,
                Command::Up => {
                    if !player.show_feedback() {
                        cursor = cursor.saturating_sub(1);
                        player.select_option(cursor);
                    }
                }
                Command::Down => {
                    if !player.show_feedback() && cursor + 1 < option_count {
                        cursor += 1;
                        player.select_option(cursor);
                    }
                }
                Command::Select(index) => {
                    if !player.show_feedback() && index < option_count {
                        cursor = index;
                        player.select_option(index);
                    }
                }
                Command::Advance => match player.advance() {
                    PlayerStep::Completed { score, total } => {
                        return Ok(PlayOutcome::Completed { score, total });
                    }
                    PlayerStep::NextQuestion | PlayerStep::NextQuiz => cursor = 0,
                    PlayerStep::NoSelection | PlayerStep::Answered { .. } => {}
                },
                Command::Retake => {}
            }
        }
    }

    /// 結果画面を表示して次の操作を待つ
    pub fn show_results(
        &mut self,
        score: u32,
        total: u32,
        total_points: u64,
        close_label: &str,
    ) -> Result<ResultsAction> {
        loop {
            self.terminal
                .draw(|f| draw_results(f, score, total, total_points, close_label))?;

            match self.next_command()? {
                Some(Command::Retake) => return Ok(ResultsAction::Retake),
                Some(Command::Quit) | Some(Command::Advance) => return Ok(ResultsAction::Close),
                Some(Command::Suspend) => self.suspend()?,
                _ => {}
            }
        }
    }
}

/// 問題画面を描画
fn draw_player(f: &mut Frame, player: &QuizPlayer, cursor: usize) {
    let quiz = player.current_quiz();
    let question = player.current_question();

    let mut title = format!(
        "{} (Question {}/{})",
        quiz.title,
        player.question_index() + 1,
        quiz.questions.len()
    );
    if player.quiz_count() > 1 {
        title = format!("[Quiz {}/{}] {}", player.quiz_index() + 1, player.quiz_count(), title);
    }
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::White));
    let inner = block.inner(f.area());
    f.render_widget(block, f.area());

    // 1. 問題文  2. 選択肢  3. フッター
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(inner);

    let question_text = Paragraph::new(question.question_text.as_str())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    f.render_widget(question_text, sections[0]);

    draw_options(f, sections[1], player, cursor);

    let action = if !player.show_feedback() {
        "Submit Answer"
    } else if player.is_last_question() {
        "Finish Quiz"
    } else {
        "Next Question"
    };
    let footer = Text::from(vec![
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Cyan)),
            Span::raw(format!(": {}  ", action)),
            Span::styled("1-9/↑↓", Style::default().fg(Color::Cyan)),
            Span::raw(": 選択  "),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(": 中断"),
        ]),
        Line::from(format!("Total Score: {}", player.score())),
    ]);
    f.render_widget(Paragraph::new(footer), sections[2]);
}

/// 選択肢を描画
///
/// 回答後は正解を緑、選んだ不正解を赤で表示する。
fn draw_options(f: &mut Frame, area: Rect, player: &QuizPlayer, cursor: usize) {
    let question = player.current_question();
    let lines: Vec<Line> = question
        .options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let selected = player.selected() == Some(idx);
            let (marker, style) = if player.show_feedback() {
                if question.is_correct(idx) {
                    (
                        "✓",
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )
                } else if selected {
                    ("✗", Style::default().fg(Color::Red))
                } else {
                    (" ", Style::default().fg(Color::DarkGray))
                }
            } else if selected {
                (
                    "›",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )
            } else if idx == cursor {
                (" ", Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED))
            } else {
                (" ", Style::default().fg(Color::White))
            };
            Line::from(vec![
                Span::styled(format!("{} {}. ", marker, idx + 1), style),
                Span::styled(option.as_str(), style),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), area);
}

/// 結果画面を描画
fn draw_results(f: &mut Frame, score: u32, total: u32, total_points: u64, close_label: &str) {
    let block = Block::default()
        .title("Quiz Completed!")
        .borders(Borders::ALL);
    let inner = block.inner(f.area());
    f.render_widget(block, f.area());

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let pct = percentage(score, total);
    let gauge = Gauge::default()
        .label(format!("Score {}%", pct))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(f64::from(pct.min(100)) / 100.0);
    f.render_widget(gauge, sections[0]);

    let summary = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{} / {}", score, total),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from("Points earned this round"),
    ]);
    f.render_widget(summary, sections[1]);

    let stored = Paragraph::new(vec![
        Line::from("Total Points Stored"),
        Line::from(Span::styled(
            total_points.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ]);
    f.render_widget(stored, sections[2]);

    let keys = Paragraph::new(Line::from(vec![
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::raw(": Retake Quiz  "),
        Span::styled("Enter/q", Style::default().fg(Color::Cyan)),
        Span::raw(format!(": {}", close_label)),
    ]));
    f.render_widget(keys, sections[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Question, Quiz};
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(key(KeyCode::Char('1'))), Some(Command::Select(0)));
        assert_eq!(map_key(key(KeyCode::Char('4'))), Some(Command::Select(3)));
        assert_eq!(map_key(key(KeyCode::Enter)), Some(Command::Advance));
        assert_eq!(map_key(key(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(map_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_draw_player_shows_question() {
        let quiz = Quiz {
            title: "Hydration".to_string(),
            questions: vec![Question {
                question_text: "Liters per day?".to_string(),
                options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
                correct_answer_index: 1,
            }],
            stats: None,
        };
        let player = QuizPlayer::new(vec![quiz]).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| draw_player(f, &player, 0)).unwrap();

        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Hydration (Question 1/1)"));
        assert!(rendered.contains("Liters per day?"));
        assert!(rendered.contains("Submit Answer"));
    }

    #[test]
    fn test_draw_player_numbers_quizzes() {
        let question = Question {
            question_text: "Pick".to_string(),
            options: vec!["a".into(), "b".into()],
            correct_answer_index: 0,
        };
        let quizzes = ["First", "Second"]
            .iter()
            .map(|title| Quiz {
                title: title.to_string(),
                questions: vec![question.clone()],
                stats: None,
            })
            .collect();
        let mut player = QuizPlayer::new(quizzes).unwrap();
        player.select_option(0);
        player.advance();
        player.advance();

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| draw_player(f, &player, 0)).unwrap();

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(rendered.contains("[Quiz 2/2] Second (Question 1/1)"));
    }

    #[test]
    fn test_draw_results() {
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        terminal
            .draw(|f| draw_results(f, 2, 3, 17, "Close Quiz"))
            .unwrap();

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(rendered.contains("2 / 3"));
        assert!(rendered.contains("67%"));
        assert!(rendered.contains("17"));
        assert!(rendered.contains("Close Quiz"));
    }
}
