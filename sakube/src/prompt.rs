use dialoguer::Confirm;

use crate::error::{Error, Result};

/// Asks the operator a yes/no question.
pub trait Confirmation {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Asks on the controlling terminal. Anything but an explicit yes is a no.
pub struct TerminalPrompt;

impl Confirmation for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .wait_for_newline(true)
            .interact()
            .map_err(Error::Prompt)
    }
}
