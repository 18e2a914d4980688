use crate::control::ServerControl;
use crate::engine::{ControlTransport, PluginClient};
use crate::error::ControlError;
use crate::model::{
    Command, CommandReport, CommandResponse, ControlConfig, Notice, NoticeTiming, PluginSettings,
    DEFAULT_PLUGIN_ID,
};
use crate::surface::{NoticeSurface, PromptSlot};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mtcadapter-ctl",
    version,
    about = "Start and stop the OctoPrint MTConnect adapter server"
)]
pub struct Cli {
    /// OctoPrint API root
    #[arg(long, env = "OCTOPRINT_API_URL", default_value = "http://127.0.0.1:5000/api")]
    pub base_url: String,

    /// Plugin identifier the control endpoint is registered under
    #[arg(long, default_value = DEFAULT_PLUGIN_ID)]
    pub plugin_id: String,

    /// API key sent as X-Api-Key
    #[arg(long, env = "OCTOPRINT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// How long a notice stays fully visible
    #[arg(long, default_value = "2s")]
    pub notice_hold: humantime::Duration,

    /// How long a notice takes to collapse
    #[arg(long, default_value = "500ms")]
    pub notice_collapse: humantime::Duration,

    /// Send one command and exit (no TUI)
    #[arg(long, value_enum)]
    pub command: Option<Command>,

    /// Skip the confirmation prompt for --command
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the --command outcome as JSON
    #[arg(long, requires = "command")]
    pub json: bool,

    /// Append diagnostics to this file [TUI default: <cache dir>/mtcadapter-ctl/mtcadapter-ctl.log]
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }

    /// Where diagnostics are appended. `None` means stderr, which only
    /// one-shot mode uses since the TUI owns the terminal.
    pub fn log_path(&self) -> Option<std::path::PathBuf> {
        if let Some(path) = &self.log_file {
            return Some(path.clone());
        }
        if !self.is_interactive() {
            return None;
        }
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("mtcadapter-ctl");
        Some(dir.join("mtcadapter-ctl.log"))
    }
}

/// Build a `ControlConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ControlConfig {
    ControlConfig {
        base_url: args.base_url.clone(),
        plugin_id: args.plugin_id.clone(),
        api_key: args.api_key.clone(),
        request_timeout: Duration::from(args.timeout),
        user_agent: format!("mtcadapter-ctl/{}", env!("CARGO_PKG_VERSION")),
        notice_timing: NoticeTiming {
            hold: Duration::from(args.notice_hold),
            collapse: Duration::from(args.notice_collapse),
        },
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if let Some(command) = args.command {
        return run_once(&args, command).await;
    }

    #[cfg(feature = "tui")]
    {
        return crate::tui::run(args).await;
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        return Err(anyhow::anyhow!(
            "built without TUI support; pass --command start|stop"
        ));
    }
}

/// Notices shown during a one-shot run, in order.
#[derive(Default)]
struct NoticeLog(Vec<Notice>);

impl NoticeSurface for NoticeLog {
    fn show_notice(&mut self, notice: Notice) {
        self.0.push(notice);
    }

    fn hide_notice(&mut self, notice: Notice) {
        self.0.retain(|n| *n != notice);
    }
}

async fn confirm(question: &'static str) -> Result<bool> {
    tokio::task::spawn_blocking(move || -> Result<bool> {
        let mut err = std::io::stderr();
        write!(err, "{question} [y/N] ")?;
        err.flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(is_yes(&line))
    })
    .await
    .context("confirmation prompt task failed")?
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn run_once(args: &Cli, command: Command) -> Result<()> {
    let cfg = build_config(args);
    let client = PluginClient::new(&cfg).context("failed to build HTTP client")?;

    if !args.yes && !confirm(command.prompt().question()).await? {
        eprintln!("Cancelled");
        return Ok(());
    }

    let mut vm = ServerControl::new();
    let mut prompts = PromptSlot::default();
    let mut notices = NoticeLog::default();
    vm.bind(&mut prompts, &mut notices);

    let transport = ReportingTransport::new(&client);
    let notice = match command {
        Command::Start => vm.start(&transport, &mut prompts, &mut notices).await,
        Command::Stop => vm.stop(&transport, &mut prompts, &mut notices).await,
    };

    let report = CommandReport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        endpoint: client.endpoint(),
        command,
        notice,
        message: notice.message().to_string(),
        running: vm.running(),
        error: transport.last_error(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.message);
        if let Some(e) = report.error.as_deref() {
            eprintln!("Error: {e}");
        }
    }

    if notice.is_failure() {
        anyhow::bail!("{command} did not succeed");
    }
    Ok(())
}

/// Wraps a transport to remember the last transport error for the report.
struct ReportingTransport<'a> {
    inner: &'a PluginClient,
    last_error: std::sync::Mutex<Option<String>>,
}

impl<'a> ReportingTransport<'a> {
    fn new(inner: &'a PluginClient) -> Self {
        Self {
            inner,
            last_error: std::sync::Mutex::new(None),
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait::async_trait]
impl ControlTransport for ReportingTransport<'_> {
    async fn send(&self, command: Command) -> Result<CommandResponse, ControlError> {
        let result = self.inner.send(command).await;
        if let Err(e) = &result {
            if let Ok(mut slot) = self.last_error.lock() {
                *slot = Some(e.to_string());
            }
        }
        result
    }

    async fn fetch_settings(&self) -> Result<PluginSettings, ControlError> {
        self.inner.fetch_settings().await
    }

    fn endpoint(&self) -> String {
        self.inner.endpoint()
    }
}
