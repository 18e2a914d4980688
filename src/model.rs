use crate::error::ControlError;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default plugin identifier, as registered with the OctoPrint host.
pub const DEFAULT_PLUGIN_ID: &str = "mtcadapter";

#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// OctoPrint API root, e.g. `http://octopi.local/api`.
    pub base_url: String,
    pub plugin_id: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub notice_timing: NoticeTiming,
}

impl ControlConfig {
    /// `POST` target for start/stop commands.
    pub fn command_url(&self) -> String {
        format!(
            "{}/plugin/{}",
            self.base_url.trim_end_matches('/'),
            self.plugin_id
        )
    }

    pub fn settings_url(&self) -> String {
        format!("{}/settings", self.base_url.trim_end_matches('/'))
    }
}

/// How long a notice stays fully visible, then how long it takes to collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeTiming {
    pub hold: Duration,
    pub collapse: Duration,
}

impl Default for NoticeTiming {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(2000),
            collapse: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Stop,
}

impl Command {
    /// Prompt the user confirms before this command is sent.
    pub fn prompt(self) -> Prompt {
        match self {
            Command::Start => Prompt::Connect,
            Command::Stop => Prompt::Disconnect,
        }
    }

    pub fn notice(self, succeeded: bool) -> Notice {
        match (self, succeeded) {
            (Command::Start, true) => Notice::StartSucceeded,
            (Command::Start, false) => Notice::StartFailed,
            (Command::Stop, true) => Notice::StopSucceeded,
            (Command::Stop, false) => Notice::StopFailed,
        }
    }

    /// Value of `running` once a response for this command has arrived.
    pub fn running_after(self) -> bool {
        matches!(self, Command::Start)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub command: Command,
}

/// Body returned by the control endpoint.
///
/// Anything other than a literal `true` under `success` counts as a failure,
/// including a missing field or a body that is not an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommandResponse {
    pub success: bool,
}

impl CommandResponse {
    pub fn from_value(v: &serde_json::Value) -> Self {
        Self {
            success: v
                .get("success")
                .and_then(|s| s.as_bool())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    StartSucceeded,
    StartFailed,
    StopSucceeded,
    StopFailed,
}

impl Notice {
    pub const ALL: [Notice; 4] = [
        Notice::StartSucceeded,
        Notice::StartFailed,
        Notice::StopSucceeded,
        Notice::StopFailed,
    ];

    /// Element identifier the plugin's templates use for this notice.
    pub fn element_id(self) -> &'static str {
        match self {
            Notice::StartSucceeded => "success-start",
            Notice::StartFailed => "failure-start",
            Notice::StopSucceeded => "success-stop",
            Notice::StopFailed => "failure-stop",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Notice::StartFailed | Notice::StopFailed)
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::StartSucceeded => "MTConnect adapter server started",
            Notice::StartFailed => "Could not start the MTConnect adapter server",
            Notice::StopSucceeded => "MTConnect adapter server stopped",
            Notice::StopFailed => "Could not stop the MTConnect adapter server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// Confirms a start.
    Connect,
    /// Confirms a stop.
    Disconnect,
}

impl Prompt {
    pub fn element_id(self) -> &'static str {
        match self {
            Prompt::Connect => "connect_server",
            Prompt::Disconnect => "disconnect_server",
        }
    }

    pub fn command(self) -> Command {
        match self {
            Prompt::Connect => Command::Start,
            Prompt::Disconnect => Command::Stop,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Prompt::Connect => "Start server",
            Prompt::Disconnect => "Stop server",
        }
    }

    pub fn question(self) -> &'static str {
        match self {
            Prompt::Connect => "Start the MTConnect adapter server?",
            Prompt::Disconnect => "Stop the MTConnect adapter server?",
        }
    }
}

/// Adapter settings as stored by the plugin on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default = "PluginSettings::default_ip")]
    pub ip: String,
    #[serde(default = "PluginSettings::default_port", deserialize_with = "number_or_text")]
    pub port: u16,
    #[serde(default = "PluginSettings::default_delay", deserialize_with = "number_or_text")]
    pub comm_delay: f64,
    #[serde(default = "PluginSettings::default_delay", deserialize_with = "number_or_text")]
    pub update_delay: f64,
}

impl PluginSettings {
    fn default_ip() -> String {
        "127.0.0.1".into()
    }

    fn default_port() -> u16 {
        7171
    }

    fn default_delay() -> f64 {
        1.0
    }

    /// Pull `plugins.<plugin_id>` out of the host's `/settings` document.
    ///
    /// `Ok(None)` means the host has no section for the plugin; a section
    /// that is present but unreadable is an error.
    pub fn from_host_settings(
        doc: &serde_json::Value,
        plugin_id: &str,
    ) -> Result<Option<Self>, serde_json::Error> {
        let Some(section) = doc.get("plugins").and_then(|p| p.get(plugin_id)) else {
            return Ok(None);
        };
        serde_json::from_value(section.clone()).map(Some)
    }
}

/// The host stores values saved from its settings form as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

fn number_or_text<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: std::fmt::Display,
{
    match NumberOrText::<T>::deserialize(d)? {
        NumberOrText::Number(v) => Ok(v),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            ip: Self::default_ip(),
            port: Self::default_port(),
            comm_delay: Self::default_delay(),
            update_delay: Self::default_delay(),
        }
    }
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug)]
pub enum ControlEvent {
    Settings(Result<PluginSettings, ControlError>),
    Settled {
        command: Command,
        result: Result<CommandResponse, ControlError>,
    },
}

/// Outcome of a one-shot command, as printed by `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub timestamp_utc: String,
    pub endpoint: String,
    pub command: Command,
    pub notice: Notice,
    pub message: String,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
