mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::engine::{ControlTransport, PluginClient};
use crate::model::{ControlEvent, Notice, NoticeTiming, Prompt};
use crate::notice::NoticePhase;
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};
use state::{KeyAction, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Full height of a notice banner, borders included.
const NOTICE_HEIGHT: u16 = 3;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = PluginClient::new(&cfg).context("failed to build HTTP client")?;
    let endpoint = client.endpoint();

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ControlEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let timing = cfg.notice_timing;
    let ui_handle = std::thread::spawn(move || run_threaded(endpoint, timing, event_rx, cmd_tx));

    let res = orchestrator::run_controller(Arc::new(client), event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
///
/// The view-model lives in `UiState`, owned by this thread only; settlements
/// arrive as events and are applied here in arrival order.
fn run_threaded(
    endpoint: String,
    timing: NoticeTiming,
    mut event_rx: UnboundedReceiver<ControlEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(endpoint, timing);

    // Short tick so collapsing notices animate smoothly.
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            let now = Instant::now();
            state.notices.prune(now);
            terminal.draw(|f| draw(f.area(), f, &state, now)).ok();
            last_tick = now;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match state.handle_key(k.modifiers, k.code) {
                    KeyAction::None => {}
                    KeyAction::Send(command) => {
                        let _ = cmd_tx.send(UiCommand::Send(command));
                    }
                    KeyAction::RefreshSettings => {
                        let _ = cmd_tx.send(UiCommand::RefreshSettings);
                    }
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let visible = state.notices.visible(now);
    let notices_height: u16 = visible.iter().map(|(_, p)| banner_height(*p)).sum();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),              // Navbar entry
                Constraint::Length(notices_height), // Transient notices
                Constraint::Min(0),                 // Settings panel
                Constraint::Length(3),              // Status line
            ]
            .as_ref(),
        )
        .split(area);

    draw_navbar(chunks[0], f, state);
    draw_notices(chunks[1], f, &visible);
    draw_settings(chunks[2], f, state);

    let status = Paragraph::new(state.info.clone())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[3]);

    if state.show_help {
        help::draw_help(centered(area, 60, 13), f);
    }
    if let Some(prompt) = state.prompts.open() {
        draw_prompt(centered(area, 48, 7), f, prompt);
    }
}

fn draw_navbar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (label, color) = if state.control.running() {
        ("● running", Color::Green)
    } else {
        ("○ stopped", Color::Gray)
    };
    let mut spans = vec![
        Span::styled("MTConnect adapter ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(label, Style::default().fg(color)),
    ];
    if state.in_flight > 0 {
        spans.push(Span::styled(
            format!("  ({} pending)", state.in_flight),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        "   enter: start/stop  ?: help  q: quit",
        Style::default().fg(Color::DarkGray),
    ));

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("mtcadapter-ctl"));
    f.render_widget(p, area);
}

/// Rows a banner occupies: full while holding, shrinking while collapsing.
fn banner_height(phase: NoticePhase) -> u16 {
    match phase {
        NoticePhase::Hidden => 0,
        NoticePhase::Holding => NOTICE_HEIGHT,
        NoticePhase::Collapsing { remaining } => {
            ((NOTICE_HEIGHT as f64 * remaining).ceil() as u16).clamp(1, NOTICE_HEIGHT)
        }
    }
}

fn draw_notices(area: Rect, f: &mut ratatui::Frame, visible: &[(Notice, NoticePhase)]) {
    let mut y = area.y;
    for (notice, phase) in visible {
        let h = banner_height(*phase).min(area.bottom().saturating_sub(y));
        if h == 0 {
            break;
        }
        let rect = Rect {
            x: area.x,
            y,
            width: area.width,
            height: h,
        };
        let color = if notice.is_failure() {
            Color::Red
        } else {
            Color::Green
        };
        let mut p = Paragraph::new(notice.message()).style(Style::default().fg(color));
        if h == NOTICE_HEIGHT {
            p = p.block(Block::default().borders(Borders::ALL));
        }
        f.render_widget(p, rect);
        y += h;
    }
}

fn draw_settings(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    state::push_status_kv(&mut lines, "Endpoint", state.endpoint.clone());
    match (&state.settings, &state.settings_error) {
        (Some(s), _) => {
            state::push_status_kv(&mut lines, "Adapter address", format!("{}:{}", s.ip, s.port));
            state::push_status_kv(&mut lines, "Send interval", format!("{} s", s.comm_delay));
            state::push_status_kv(&mut lines, "Update interval", format!("{} s", s.update_delay));
        }
        (None, Some(e)) => {
            lines.push(Line::from(Span::styled(
                format!("Plugin settings unavailable: {e}"),
                Style::default().fg(Color::Red),
            )));
        }
        (None, None) => lines.push(Line::from("Loading plugin settings…")),
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(p, area);
}

fn draw_prompt(area: Rect, f: &mut ratatui::Frame, prompt: Prompt) {
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(prompt.question()),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", Style::default().fg(Color::Magenta)),
            Span::raw(" confirm   "),
            Span::styled("[n]", Style::default().fg(Color::Magenta)),
            Span::raw(" cancel"),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(prompt.title())
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
