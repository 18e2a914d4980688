mod octoprint;
#[cfg(test)]
pub(crate) mod test_support;

pub use octoprint::PluginClient;

use crate::error::ControlError;
use crate::model::{Command, CommandResponse, PluginSettings};
use async_trait::async_trait;

/// Carries control commands to the plugin endpoint.
///
/// Implementations resolve exactly once per call and never retry.
#[async_trait]
pub trait ControlTransport: Send + Sync {
    async fn send(&self, command: Command) -> Result<CommandResponse, ControlError>;

    async fn fetch_settings(&self) -> Result<PluginSettings, ControlError>;

    /// Human-readable target, used in logs and reports.
    fn endpoint(&self) -> String;
}
