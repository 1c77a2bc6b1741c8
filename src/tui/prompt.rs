use inquire::Confirm;
use tracing::warn;

use crate::sync::policy::ConfirmPrompt;

/// Asks on the terminal. A prompt that cannot be shown (no TTY, interrupted)
/// counts as "no".
pub struct TerminalPrompt;

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        match Confirm::new(message).with_default(false).prompt() {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "confirmation prompt unavailable, answering no");
                false
            }
        }
    }
}
