//! Few-shot conversation builder.
//!
//! Produces the message history handed to the chat engine: a system instruction,
//! demonstration pairs, then the real instruction.

use crate::types::message::Message;
use serde::{Deserialize, Serialize};

/// A fixed demonstration: what the user asked, and the answer we want imitated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub input: String,
    pub output: String,
}

impl FewShotExample {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Builder for a few-shot conversation.
#[derive(Debug, Clone, Default)]
pub struct FewShotPrompt {
    system: Option<String>,
    context: Option<String>,
    examples: Vec<FewShotExample>,
}

impl FewShotPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.system = Some(text.into());
        self
    }

    /// Reference material appended to the system message (e.g. the dataset listing).
    pub fn context(mut self, text: impl Into<String>) -> Self {
        self.context = Some(text.into());
        self
    }

    pub fn example(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.examples.push(FewShotExample::new(input, output));
        self
    }

    pub fn examples(mut self, examples: impl IntoIterator<Item = FewShotExample>) -> Self {
        self.examples.extend(examples);
        self
    }

    /// Render the conversation for `instruction`.
    pub fn build(&self, instruction: impl Into<String>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.examples.len() * 2 + 2);

        let system = match (&self.system, &self.context) {
            (Some(s), Some(c)) => Some(format!("{}\n\n{}", s, c)),
            (Some(s), None) => Some(s.clone()),
            (None, Some(c)) => Some(c.clone()),
            (None, None) => None,
        };
        if let Some(system) = system {
            messages.push(Message::system(system));
        }

        for ex in &self.examples {
            messages.push(Message::user(ex.input.clone()));
            messages.push(Message::assistant(ex.output.clone()));
        }

        messages.push(Message::user(instruction));
        messages
    }
}
