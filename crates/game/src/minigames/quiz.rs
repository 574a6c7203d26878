use std::time::Duration;

use escape_engine::{MinigameInput, SurfaceTint};

use super::meets_pass_ratio;
use super::session::{SessionContext, Waited};

pub(super) const NAME: &str = "Quiz Kahoot";
pub(super) const DESCRIPTION: &str = "Answer all questions correctly to win!";

const FEEDBACK_PAUSE: Duration = Duration::from_millis(1500);
const INPUT_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct QuizQuestion {
    pub(super) prompt: &'static str,
    pub(super) answers: [&'static str; 4],
    pub(super) correct: usize,
}

pub(super) const QUESTIONS: [QuizQuestion; 5] = [
    QuizQuestion {
        prompt: "What is the capital of Italy?",
        answers: ["Rome", "Milan", "Naples", "Turin"],
        correct: 0,
    },
    QuizQuestion {
        prompt: "Who wrote 'The Divine Comedy'?",
        answers: ["Petrarch", "Boccaccio", "Dante", "Manzoni"],
        correct: 2,
    },
    QuizQuestion {
        prompt: "What is the result of 2 + 2?",
        answers: ["3", "4", "5", "6"],
        correct: 1,
    },
    QuizQuestion {
        prompt: "In what year did the Berlin Wall fall?",
        answers: ["1987", "1988", "1989", "1990"],
        correct: 2,
    },
    QuizQuestion {
        prompt: "Which planet is closest to the Sun?",
        answers: ["Venus", "Mercury", "Earth", "Mars"],
        correct: 1,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct AnswerOutcome {
    pub(super) correct: bool,
    pub(super) correct_answer: &'static str,
}

/// Question cursor, highlighted answer and running tally for one quiz.
#[derive(Debug, Clone)]
pub(super) struct QuizRound {
    questions: Vec<QuizQuestion>,
    current: usize,
    selected: usize,
    correct_answers: usize,
}

impl QuizRound {
    pub(super) fn new(questions: &[QuizQuestion]) -> Self {
        Self {
            questions: questions.to_vec(),
            current: 0,
            selected: 0,
            correct_answers: 0,
        }
    }

    pub(super) fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub(super) fn question_number(&self) -> usize {
        self.current + 1
    }

    pub(super) fn total(&self) -> usize {
        self.questions.len()
    }

    pub(super) fn selected(&self) -> usize {
        self.selected
    }

    pub(super) fn correct_answers(&self) -> usize {
        self.correct_answers
    }

    /// Up/Left and Down/Right cycle through the answers of the current
    /// question, wrapping at both ends.
    pub(super) fn move_selection(&mut self, input: MinigameInput) {
        let Some(question) = self.current() else {
            return;
        };
        let count = question.answers.len();
        self.selected = match input {
            MinigameInput::Up | MinigameInput::Left => (self.selected + count - 1) % count,
            MinigameInput::Down | MinigameInput::Right => (self.selected + 1) % count,
            MinigameInput::Confirm => self.selected,
        };
    }

    /// Locks in the highlighted answer and moves on to the next question.
    pub(super) fn answer(&mut self) -> Option<AnswerOutcome> {
        let question = *self.current()?;
        let correct = self.selected == question.correct;
        if correct {
            self.correct_answers += 1;
        }
        self.current += 1;
        self.selected = 0;
        Some(AnswerOutcome {
            correct,
            correct_answer: question.answers[question.correct],
        })
    }

    pub(super) fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub(super) fn passed(&self) -> bool {
        self.is_finished() && meets_pass_ratio(self.correct_answers, self.total())
    }
}

pub(super) fn run(context: &SessionContext) -> bool {
    let surface = context.surface();
    let mut round = QuizRound::new(&QUESTIONS);

    while let Some(question) = round.current().copied() {
        surface.set_tint(SurfaceTint::Neutral);
        surface.set_prompt(format!(
            "Question {}/{}: {}",
            round.question_number(),
            round.total(),
            question.prompt
        ));
        surface.set_options(
            question.answers.iter().map(|answer| answer.to_string()).collect(),
            Some(round.selected()),
        );

        let outcome = loop {
            match context.wait_for_input(INPUT_WAIT) {
                Waited::Input(MinigameInput::Confirm) => break round.answer(),
                Waited::Input(direction) => {
                    round.move_selection(direction);
                    surface.set_selected(Some(round.selected()));
                }
                Waited::Elapsed => {}
                Waited::Aborted => return false,
            }
        };

        if let Some(outcome) = outcome {
            if outcome.correct {
                surface.set_tint(SurfaceTint::Success);
                surface.set_prompt("Correct!");
            } else {
                surface.set_tint(SurfaceTint::Failure);
                surface.set_prompt(format!(
                    "Wrong! The answer was {}",
                    outcome.correct_answer
                ));
            }
        }
        if !context.pause(FEEDBACK_PAUSE) {
            return false;
        }
    }

    let passed = round.passed();
    surface.set_options(Vec::new(), None);
    surface.set_tint(if passed {
        SurfaceTint::Success
    } else {
        SurfaceTint::Failure
    });
    surface.set_prompt(format!(
        "Quiz finished: {}/{} correct",
        round.correct_answers(),
        round.total()
    ));
    context.pause(FEEDBACK_PAUSE) && passed
}
