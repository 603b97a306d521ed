//! Operator interaction.
//!
//! The resolution engine only talks to the operator through [`Prompt`]:
//! ask a question (optionally offering single-key choices) and read one
//! answer, or show a notice. Menus are typed via [`MenuChoice`] and
//! re-asked on invalid input up to a bounded number of attempts.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::{GopackError, Result};
use crate::vcs::ScmKind;

/// One offered key and what it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub key: char,
    pub label: String,
}

/// Source of operator answers.
pub trait Prompt {
    /// Show `question` and `options`, return the raw answer line.
    ///
    /// `options` is empty for free-text questions.
    fn ask(&mut self, question: &str, options: &[MenuOption]) -> Result<String>;

    /// Tell the operator something without expecting an answer.
    fn notify(&mut self, message: &str);
}

impl<P: Prompt + ?Sized> Prompt for &mut P {
    fn ask(&mut self, question: &str, options: &[MenuOption]) -> Result<String> {
        (**self).ask(question, options)
    }

    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}

/// A value selectable from a single-key menu.
pub trait MenuChoice: Copy {
    fn key(&self) -> char;
    fn label(&self) -> String;
}

impl MenuChoice for ScmKind {
    fn key(&self) -> char {
        match self {
            ScmKind::Git => 'G',
            ScmKind::Mercurial => 'H',
            ScmKind::Subversion => 'S',
            ScmKind::Bazaar => 'B',
        }
    }

    fn label(&self) -> String {
        ScmKind::label(*self).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl MenuChoice for YesNo {
    fn key(&self) -> char {
        match self {
            YesNo::Yes => 'Y',
            YesNo::No => 'N',
        }
    }

    fn label(&self) -> String {
        match self {
            YesNo::Yes => "Yes".to_string(),
            YesNo::No => "No".to_string(),
        }
    }
}

/// Notice shown when an answer is not one of the offered keys.
pub const INVALID_ANSWER_NOTICE: &str = "You are likely to be eaten by a grue.";

/// Ask until the answer is exactly one of the offered keys
/// (case-insensitively, surrounding whitespace ignored).
pub fn choose<P, C>(
    prompt: &mut P,
    question: &str,
    choices: &[C],
    max_attempts: usize,
) -> Result<C>
where
    P: Prompt + ?Sized,
    C: MenuChoice,
{
    let options: Vec<MenuOption> = choices
        .iter()
        .map(|c| MenuOption {
            key: c.key(),
            label: c.label(),
        })
        .collect();

    for attempt in 1..=max_attempts.max(1) {
        let answer = prompt.ask(question, &options)?;
        let picked = single_key(&answer).and_then(|key| {
            choices
                .iter()
                .copied()
                .find(|c| c.key().eq_ignore_ascii_case(&key))
        });
        match picked {
            Some(choice) => return Ok(choice),
            None => {
                debug!(question, answer = %answer.trim(), attempt, "invalid menu answer");
                prompt.notify(INVALID_ANSWER_NOTICE);
            }
        }
    }

    Err(GopackError::TooManyInvalidAnswers {
        question: question.to_string(),
        attempts: max_attempts.max(1),
    })
}

/// The answer's only character, if it has exactly one after trimming.
fn single_key(answer: &str) -> Option<char> {
    let mut chars = answer.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

/// Ask for a non-blank free-text answer.
pub fn ask_text<P>(prompt: &mut P, question: &str, max_attempts: usize) -> Result<String>
where
    P: Prompt + ?Sized,
{
    for _ in 0..max_attempts.max(1) {
        let answer = prompt.ask(question, &[])?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        prompt.notify("An answer is required.");
    }

    Err(GopackError::TooManyInvalidAnswers {
        question: question.to_string(),
        attempts: max_attempts.max(1),
    })
}

/// Ask for free text, falling back to `default` on a blank answer.
pub fn ask_with_default<P>(prompt: &mut P, question: &str, default: &str) -> Result<String>
where
    P: Prompt + ?Sized,
{
    let answer = prompt.ask(&format!("{question} [{default}]:"), &[])?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Line-oriented prompt over any reader/writer pair, usually stdin/stdout.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn ask(&mut self, question: &str, options: &[MenuOption]) -> Result<String> {
        writeln!(self.output, "{question}")?;
        for opt in options {
            writeln!(self.output, "\t'{}'\t:\t{}", opt.key, opt.label)?;
        }
        write!(self.output, "[Answer:] ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(GopackError::InputClosed(question.to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn notify(&mut self, message: &str) {
        // Nothing useful to do if the terminal is gone.
        let _ = writeln!(self.output, "{message}");
    }
}
