//! Start/stop control flow for the adapter server.
//!
//! `ServerControl` owns the `running` flag. Commands go out in two halves:
//! [`ServerControl::begin`] closes the confirmation prompt and yields the
//! request body, [`ServerControl::settle`] applies the response once it
//! arrives. [`ServerControl::start`] and [`ServerControl::stop`] run both
//! halves around a transport call for callers that can simply await.

use crate::engine::ControlTransport;
use crate::error::ControlError;
use crate::model::{Command, CommandRequest, CommandResponse, Notice, Prompt};
use crate::surface::{NoticeSurface, PromptSurface};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerControl {
    running: bool,
}

impl ServerControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Reset the bound surfaces: both prompts closed, every notice hidden.
    pub fn bind(&self, prompts: &mut dyn PromptSurface, notices: &mut dyn NoticeSurface) {
        prompts.hide_prompt(Prompt::Connect);
        prompts.hide_prompt(Prompt::Disconnect);
        for n in Notice::ALL {
            notices.hide_notice(n);
        }
    }

    /// Ask for confirmation of whichever command would flip the current state.
    pub fn request_status_change(&self, prompts: &mut dyn PromptSurface) -> Prompt {
        let prompt = if self.running {
            Prompt::Disconnect
        } else {
            Prompt::Connect
        };
        prompts.show_prompt(prompt);
        prompt
    }

    /// Close the command's prompt and produce the body to send.
    pub fn begin(&self, command: Command, prompts: &mut dyn PromptSurface) -> CommandRequest {
        let prompt = command.prompt();
        tracing::info!(%command, prompt = prompt.element_id(), "issuing adapter command");
        prompts.hide_prompt(prompt);
        CommandRequest { command }
    }

    /// Apply a finished round trip and show the matching notice.
    ///
    /// Any response that parsed updates `running`, even one reporting
    /// `success: false`. A transport error leaves `running` untouched.
    pub fn settle(
        &mut self,
        command: Command,
        result: Result<CommandResponse, ControlError>,
        notices: &mut dyn NoticeSurface,
    ) -> Notice {
        let notice = match result {
            Ok(resp) => {
                self.running = command.running_after();
                if resp.success {
                    tracing::info!(%command, running = self.running, "adapter command accepted");
                } else {
                    tracing::info!(%command, running = self.running, "adapter command rejected by plugin");
                }
                command.notice(resp.success)
            }
            Err(e) => {
                tracing::warn!(%command, error = %e, "adapter command failed in transport");
                command.notice(false)
            }
        };
        tracing::debug!(notice = notice.element_id(), "showing notice");
        notices.show_notice(notice);
        notice
    }

    pub async fn start<T>(
        &mut self,
        transport: &T,
        prompts: &mut dyn PromptSurface,
        notices: &mut dyn NoticeSurface,
    ) -> Notice
    where
        T: ControlTransport + ?Sized,
    {
        self.execute(Command::Start, transport, prompts, notices).await
    }

    pub async fn stop<T>(
        &mut self,
        transport: &T,
        prompts: &mut dyn PromptSurface,
        notices: &mut dyn NoticeSurface,
    ) -> Notice
    where
        T: ControlTransport + ?Sized,
    {
        self.execute(Command::Stop, transport, prompts, notices).await
    }

    async fn execute<T>(
        &mut self,
        command: Command,
        transport: &T,
        prompts: &mut dyn PromptSurface,
        notices: &mut dyn NoticeSurface,
    ) -> Notice
    where
        T: ControlTransport + ?Sized,
    {
        let request = self.begin(command, prompts);
        let result = transport.send(request.command).await;
        self.settle(command, result, notices)
    }
}
