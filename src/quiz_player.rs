use crate::types::{Question, Quiz};
use anyhow::{bail, Result};

/// `advance` の結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStep {
    /// 選択肢が選ばれていないため何もしなかった
    NoSelection,
    /// 回答を確定し、正誤を表示中
    Answered { correct: bool },
    /// 次の問題へ進んだ
    NextQuestion,
    /// 次のクイズへ進んだ
    NextQuiz,
    /// 全問終了
    Completed { score: u32, total: u32 },
}

/// クイズを順番に解くための状態
///
/// 1回目の `advance` で回答を確定し、2回目で次へ進む。
pub struct QuizPlayer {
    quizzes: Vec<Quiz>,
    quiz_index: usize,
    question_index: usize,
    selected: Option<usize>,
    show_feedback: bool,
    score: u32,
    completed: bool,
}

impl QuizPlayer {
    /// # Errors
    ///
    /// 問題が1問もない場合にエラーを返す。
    pub fn new(quizzes: Vec<Quiz>) -> Result<Self> {
        // 問題のないクイズは飛ばす
        let quizzes: Vec<Quiz> = quizzes
            .into_iter()
            .filter(|q| !q.questions.is_empty())
            .collect();
        if quizzes.is_empty() {
            bail!("回答できる問題がありません");
        }
        Ok(Self {
            quizzes,
            quiz_index: 0,
            question_index: 0,
            selected: None,
            show_feedback: false,
            score: 0,
            completed: false,
        })
    }

    pub fn current_quiz(&self) -> &Quiz {
        &self.quizzes[self.quiz_index]
    }

    pub fn current_question(&self) -> &Question {
        &self.current_quiz().questions[self.question_index]
    }

    /// 現在のクイズ内での問題番号（0始まり）
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn quiz_index(&self) -> usize {
        self.quiz_index
    }

    pub fn quiz_count(&self) -> usize {
        self.quizzes.len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn show_feedback(&self) -> bool {
        self.show_feedback
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// 全クイズの問題数の合計
    pub fn total_questions(&self) -> u32 {
        self.quizzes.iter().map(|q| q.questions.len() as u32).sum()
    }

    /// 最後の問題かどうか
    pub fn is_last_question(&self) -> bool {
        self.quiz_index == self.quizzes.len() - 1
            && self.question_index == self.current_quiz().questions.len() - 1
    }

    /// 選択肢を選ぶ
    ///
    /// 正誤表示中と終了後は無視する。範囲外の番号も無視する。
    pub fn select_option(&mut self, index: usize) {
        if self.show_feedback || self.completed {
            return;
        }
        if index < self.current_question().options.len() {
            self.selected = Some(index);
        }
    }

    /// 回答を確定、または次の問題へ進む
    pub fn advance(&mut self) -> PlayerStep {
        if self.completed {
            return PlayerStep::Completed {
                score: self.score,
                total: self.total_questions(),
            };
        }
        let Some(selected) = self.selected else {
            return PlayerStep::NoSelection;
        };

        if !self.show_feedback {
            self.show_feedback = true;
            let correct = self.current_question().is_correct(selected);
            if correct {
                self.score += 1;
            }
            return PlayerStep::Answered { correct };
        }

        self.show_feedback = false;
        self.selected = None;

        if self.question_index < self.current_quiz().questions.len() - 1 {
            self.question_index += 1;
            PlayerStep::NextQuestion
        } else if self.quiz_index < self.quizzes.len() - 1 {
            self.quiz_index += 1;
            self.question_index = 0;
            PlayerStep::NextQuiz
        } else {
            self.completed = true;
            PlayerStep::Completed {
                score: self.score,
                total: self.total_questions(),
            }
        }
    }

    /// 最初からやり直す
    pub fn retake(&mut self) {
        self.quiz_index = 0;
        self.question_index = 0;
        self.selected = None;
        self.show_feedback = false;
        self.score = 0;
        self.completed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(title: &str, answers: &[i64]) -> Quiz {
        Quiz {
            title: title.to_string(),
            questions: answers
                .iter()
                .map(|&a| Question {
                    question_text: format!("{} q", title),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer_index: a,
                })
                .collect(),
            stats: None,
        }
    }

    #[test]
    fn test_empty_session_rejected() {
        assert!(QuizPlayer::new(vec![]).is_err());
        assert!(QuizPlayer::new(vec![quiz("empty", &[])]).is_err());
    }

    #[test]
    fn test_advance_without_selection_is_noop() {
        let mut player = QuizPlayer::new(vec![quiz("A", &[0])]).unwrap();
        assert_eq!(player.advance(), PlayerStep::NoSelection);
        assert!(!player.show_feedback());
    }

    #[test]
    fn test_full_run_across_quizzes() {
        let mut player = QuizPlayer::new(vec![quiz("A", &[0, 1]), quiz("B", &[2])]).unwrap();
        assert_eq!(player.total_questions(), 3);

        // A-1: 正解
        player.select_option(0);
        assert_eq!(player.advance(), PlayerStep::Answered { correct: true });
        // 正誤表示中は選択を変えられない
        player.select_option(3);
        assert_eq!(player.selected(), Some(0));
        assert_eq!(player.advance(), PlayerStep::NextQuestion);

        // A-2: 不正解
        player.select_option(3);
        assert_eq!(player.advance(), PlayerStep::Answered { correct: false });
        assert_eq!(player.advance(), PlayerStep::NextQuiz);
        assert_eq!(player.current_quiz().title, "B");
        assert_eq!(player.question_index(), 0);

        // B-1: 正解
        player.select_option(2);
        assert!(player.is_last_question());
        assert_eq!(player.advance(), PlayerStep::Answered { correct: true });
        assert_eq!(player.advance(), PlayerStep::Completed { score: 2, total: 3 });
        assert!(player.is_completed());
    }

    #[test]
    fn test_out_of_range_answer_scores_zero() {
        let mut player = QuizPlayer::new(vec![quiz("A", &[9])]).unwrap();
        player.select_option(0);
        assert_eq!(player.advance(), PlayerStep::Answered { correct: false });
        assert_eq!(player.advance(), PlayerStep::Completed { score: 0, total: 1 });
    }

    #[test]
    fn test_skips_quizzes_without_questions() {
        let player = QuizPlayer::new(vec![quiz("empty", &[]), quiz("A", &[1])]).unwrap();
        assert_eq!(player.quiz_count(), 1);
        assert_eq!(player.current_quiz().title, "A");
    }

    #[test]
    fn test_retake_resets() {
        let mut player = QuizPlayer::new(vec![quiz("A", &[0])]).unwrap();
        player.select_option(0);
        player.advance();
        player.advance();
        assert!(player.is_completed());

        player.retake();
        assert_eq!(player.score(), 0);
        assert!(!player.is_completed());
        assert_eq!(player.selected(), None);
    }
}
