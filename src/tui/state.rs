use crate::control::ServerControl;
use crate::model::{Command, ControlEvent, NoticeTiming, PluginSettings};
use crate::notice::NoticeBoard;
use crate::surface::{PromptSlot, PromptSurface};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Send(Command),
    RefreshSettings,
    Quit,
}

pub struct UiState {
    pub control: ServerControl,
    pub prompts: PromptSlot,
    pub notices: NoticeBoard,
    pub endpoint: String,
    pub settings: Option<PluginSettings>,
    pub settings_error: Option<String>,
    pub info: String,
    pub show_help: bool,
    /// Requests sent but not yet settled.
    pub in_flight: usize,
}

impl UiState {
    /// Fresh state with every prompt closed and every notice hidden.
    pub fn new(endpoint: String, timing: NoticeTiming) -> Self {
        let mut state = Self {
            control: ServerControl::new(),
            prompts: PromptSlot::default(),
            notices: NoticeBoard::new(timing),
            endpoint,
            settings: None,
            settings_error: None,
            info: String::new(),
            show_help: false,
            in_flight: 0,
        };
        state.control.bind(&mut state.prompts, &mut state.notices);
        state
    }

    pub fn handle_key(&mut self, modifiers: KeyModifiers, code: KeyCode) -> KeyAction {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        if let Some(prompt) = self.prompts.open() {
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    let command = prompt.command();
                    self.control.begin(command, &mut self.prompts);
                    self.in_flight += 1;
                    self.info = format!("Sending {command}…");
                    KeyAction::Send(command)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.prompts.hide_prompt(prompt);
                    KeyAction::None
                }
                _ => KeyAction::None,
            };
        }

        match code {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.show_help = false;
                self.control.request_status_change(&mut self.prompts);
                KeyAction::None
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                KeyAction::None
            }
            KeyCode::Esc => {
                self.show_help = false;
                KeyAction::None
            }
            KeyCode::Char('r') => {
                self.info = "Reloading plugin settings…".into();
                KeyAction::RefreshSettings
            }
            _ => KeyAction::None,
        }
    }

    pub fn apply_event(&mut self, ev: ControlEvent) {
        match ev {
            ControlEvent::Settled { command, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.info = match &result {
                    Ok(r) if r.success => format!("{command}: accepted"),
                    Ok(_) => format!("{command}: rejected by plugin"),
                    Err(e) => format!("{command} failed: {e}"),
                };
                self.control.settle(command, result, &mut self.notices);
            }
            ControlEvent::Settings(Ok(s)) => {
                self.settings = Some(s);
                self.settings_error = None;
                self.info = "Plugin settings loaded".into();
            }
            ControlEvent::Settings(Err(e)) => {
                self.settings_error = Some(e.to_string());
                self.info = "Plugin settings unavailable".into();
            }
        }
    }
}

pub fn push_status_kv(out: &mut Vec<Line<'static>>, label: &str, value: String) {
    out.push(Line::from(vec![
        Span::styled(format!("{label}:"), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::raw(value),
    ]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::model::{CommandResponse, Notice, Prompt};
    use std::time::Instant;

    fn state() -> UiState {
        UiState::new("http://octopi/api/plugin/mtcadapter".into(), NoticeTiming::default())
    }

    fn press(s: &mut UiState, code: KeyCode) -> KeyAction {
        s.handle_key(KeyModifiers::NONE, code)
    }

    #[test]
    fn enter_opens_start_prompt_and_y_sends() {
        let mut s = state();
        assert_eq!(press(&mut s, KeyCode::Enter), KeyAction::None);
        assert_eq!(s.prompts.open(), Some(Prompt::Connect));

        assert_eq!(press(&mut s, KeyCode::Char('y')), KeyAction::Send(Command::Start));
        assert_eq!(s.prompts.open(), None);
        assert_eq!(s.in_flight, 1);
        // Still stopped until the response arrives.
        assert!(!s.control.running());

        s.apply_event(ControlEvent::Settled {
            command: Command::Start,
            result: Ok(CommandResponse { success: true }),
        });
        assert!(s.control.running());
        assert_eq!(s.in_flight, 0);
        assert_eq!(
            s.notices.visible(Instant::now()).first().map(|(n, _)| *n),
            Some(Notice::StartSucceeded)
        );

        press(&mut s, KeyCode::Char(' '));
        assert_eq!(s.prompts.open(), Some(Prompt::Disconnect));
    }

    #[test]
    fn dismissing_prompt_sends_nothing() {
        let mut s = state();
        for _ in 0..3 {
            assert_eq!(press(&mut s, KeyCode::Enter), KeyAction::None);
            assert_eq!(press(&mut s, KeyCode::Esc), KeyAction::None);
        }
        assert_eq!(s.prompts.open(), None);
        assert_eq!(s.in_flight, 0);
        assert!(!s.control.running());
    }

    #[test]
    fn transport_failure_is_reported_in_status() {
        let mut s = state();
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Enter);
        s.apply_event(ControlEvent::Settled {
            command: Command::Start,
            result: Err(ControlError::Timeout),
        });
        assert!(!s.control.running());
        assert_eq!(s.info, "start failed: request timed out");
        assert_eq!(
            s.notices.visible(Instant::now()).first().map(|(n, _)| *n),
            Some(Notice::StartFailed)
        );
    }

    #[test]
    fn quit_keys() {
        let mut s = state();
        assert_eq!(press(&mut s, KeyCode::Char('q')), KeyAction::Quit);
        press(&mut s, KeyCode::Enter);
        // 'q' inside a prompt is ignored, Ctrl-C always quits.
        assert_eq!(press(&mut s, KeyCode::Char('q')), KeyAction::None);
        assert_eq!(
            s.handle_key(KeyModifiers::CONTROL, KeyCode::Char('c')),
            KeyAction::Quit
        );
    }

    #[test]
    fn settings_events() {
        let mut s = state();
        s.apply_event(ControlEvent::Settings(Err(ControlError::Request("refused".into()))));
        assert_eq!(s.settings_error.as_deref(), Some("request failed: refused"));

        s.apply_event(ControlEvent::Settings(Ok(PluginSettings::default())));
        assert_eq!(s.settings.as_ref().map(|p| p.port), Some(7171));
        assert!(s.settings_error.is_none());
        assert_eq!(press(&mut s, KeyCode::Char('r')), KeyAction::RefreshSettings);
    }
}
