use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::registry_utils::is_affirmative;

/// Source of answers to yes/no questions.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Asks on stdout and reads one line from stdin. I/O failures count as "no".
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        let mut stdout = io::stdout();
        if write!(stdout, "{} (y/N) ", question).and_then(|_| stdout.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

/// Replays canned answers in order, then answers "no". Records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .map(|a| is_affirmative(&a))
            .unwrap_or(false)
    }
}
