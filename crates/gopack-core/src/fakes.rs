//! Scripted stand-ins for the operator and the network (testing only)
//!
//! Provides `ScriptedPrompt` and `RecordingFetcher`, which satisfy the
//! [`Prompt`] and [`Fetcher`] contracts without a terminal or any
//! version-control binaries.

use std::collections::VecDeque;
use std::fs;

use crate::error::{GopackError, Result};
use crate::prompt::{MenuOption, Prompt};
use crate::vcs::{FetchPlan, Fetcher};

// ---------------------------------------------------------------------------
// ScriptedPrompt
// ---------------------------------------------------------------------------

/// Replays queued answers and records everything it was shown.
///
/// Running out of answers behaves like a closed terminal.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    /// Every question asked, in order
    pub questions: Vec<String>,
    /// Every notice shown, in order
    pub notices: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str, _options: &[MenuOption]) -> Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| GopackError::InputClosed(question.to_string()))
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// RecordingFetcher
// ---------------------------------------------------------------------------

/// Records every plan it is handed instead of running it.
///
/// On success the plan's target directory is created, the way a real
/// clone would leave it.
#[derive(Debug, Default, Clone)]
pub struct RecordingFetcher {
    pub plans: Vec<FetchPlan>,
    fail_with: Option<String>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fetcher whose every fetch fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            plans: Vec::new(),
            fail_with: Some(message.into()),
        }
    }
}

impl Fetcher for RecordingFetcher {
    fn fetch(&mut self, plan: &FetchPlan) -> Result<()> {
        self.plans.push(plan.clone());
        if let Some(message) = &self.fail_with {
            return Err(GopackError::FetchFailed {
                remote: plan.remote.clone(),
                message: message.clone(),
            });
        }
        fs::create_dir_all(&plan.target)?;
        Ok(())
    }
}
