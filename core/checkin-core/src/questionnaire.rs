//! Questionnaire state behind the full-screen prompt.
//!
//! Two required questions plus optional free text. The moment both questions
//! hold a selection the questionnaire is complete and yields its answers;
//! there is no separate submit step.

use serde::{Deserialize, Serialize};

use crate::error::{CheckinError, Result};
use crate::types::CheckinAnswers;

pub const MIN_OPTION: i32 = 1;
pub const MAX_OPTION: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum Question {
    Feeling,
    SleepQuality,
}

impl Question {
    pub fn prompt(self) -> &'static str {
        match self {
            Question::Feeling => "How are you feeling?",
            Question::SleepQuality => "How did you sleep?",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionnaireState {
    feeling: Option<i32>,
    sleep_quality: Option<i32>,
    additional_info: String,
}

impl QuestionnaireState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a selection. Returns the answers once both questions are set.
    pub fn select(&mut self, question: Question, option: i32) -> Result<Option<CheckinAnswers>> {
        if !(MIN_OPTION..=MAX_OPTION).contains(&option) {
            return Err(CheckinError::invalid_argument(format!(
                "option {} for {:?} is outside {}..={}",
                option, question, MIN_OPTION, MAX_OPTION
            )));
        }

        match question {
            Question::Feeling => self.feeling = Some(option),
            Question::SleepQuality => self.sleep_quality = Some(option),
        }
        Ok(self.answers())
    }

    pub fn set_additional_info(&mut self, text: impl Into<String>) {
        self.additional_info = text.into();
    }

    pub fn selection(&self, question: Question) -> Option<i32> {
        match question {
            Question::Feeling => self.feeling,
            Question::SleepQuality => self.sleep_quality,
        }
    }

    pub fn answers(&self) -> Option<CheckinAnswers> {
        match (self.feeling, self.sleep_quality) {
            (Some(feeling), Some(sleep_quality)) => Some(CheckinAnswers {
                feeling,
                sleep_quality,
                additional_info: self.additional_info.clone(),
            }),
            _ => None,
        }
    }
}
