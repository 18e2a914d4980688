//! Capabilities the control logic needs from whatever renders it.
//!
//! The view-model never touches a widget directly; it asks a surface to show
//! or hide one of the named prompts and notices.

use crate::model::{Notice, Prompt};

pub trait PromptSurface {
    fn show_prompt(&mut self, prompt: Prompt);
    fn hide_prompt(&mut self, prompt: Prompt);
}

pub trait NoticeSurface {
    /// Start the notice's hold-then-collapse timeline from now.
    fn show_notice(&mut self, notice: Notice);
    fn hide_notice(&mut self, notice: Notice);
}

/// At most one prompt open at a time; opening one closes the other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PromptSlot {
    open: Option<Prompt>,
}

impl PromptSlot {
    pub fn open(&self) -> Option<Prompt> {
        self.open
    }
}

impl PromptSurface for PromptSlot {
    fn show_prompt(&mut self, prompt: Prompt) {
        self.open = Some(prompt);
    }

    fn hide_prompt(&mut self, prompt: Prompt) {
        if self.open == Some(prompt) {
            self.open = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keeps_a_single_prompt() {
        let mut slot = PromptSlot::default();
        slot.show_prompt(Prompt::Connect);
        slot.show_prompt(Prompt::Disconnect);
        assert_eq!(slot.open(), Some(Prompt::Disconnect));

        // Hiding a prompt that is not open leaves the other alone.
        slot.hide_prompt(Prompt::Connect);
        assert_eq!(slot.open(), Some(Prompt::Disconnect));

        slot.hide_prompt(Prompt::Disconnect);
        assert_eq!(slot.open(), None);
    }
}
