//! Continuous speech capture as an explicit state machine.
//!
//! Recognition engines stop on their own after silence. While the user
//! wants to keep listening, an engine end triggers a restart instead of
//! dropping back to stopped. The machine never talks to an engine directly:
//! [`SpeechCapture::handle`] consumes an event and returns the commands the
//! host should carry out.

use tracing::{debug, warn};

use crate::config::AnnotatorConfig;

pub const DEFAULT_SPEECH_LANGUAGE: &str = "es-419";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Stopped,
    Listening,
    /// The engine ended on its own and a restart has been requested.
    Restarting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The user flipped the capture switch.
    Toggle,
    EngineStarted,
    EngineEnded,
    Transcript { text: String, is_final: bool },
    EngineError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCommand {
    StartEngine,
    StopEngine,
    /// A finalized transcript, ready to become the annotation text.
    Deliver(String),
}

#[derive(Debug, Clone)]
pub struct SpeechCapture {
    state: CaptureState,
    language: String,
    preview: String,
    last_error: Option<String>,
}

impl Default for SpeechCapture {
    fn default() -> Self {
        Self::new(DEFAULT_SPEECH_LANGUAGE)
    }
}

impl SpeechCapture {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            state: CaptureState::Stopped,
            language: language.into(),
            preview: String::new(),
            last_error: None,
        }
    }

    /// A stopped capture in the configured `speech_language`.
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self::new(config.speech_language.clone())
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// BCP 47 tag the engine should be started with.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Latest interim transcript, for live display only.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.state != CaptureState::Stopped
    }

    pub fn handle(&mut self, event: SpeechEvent) -> Vec<SpeechCommand> {
        use CaptureState::*;

        match (self.state, event) {
            (Stopped, SpeechEvent::Toggle) => {
                self.last_error = None;
                self.transition(Listening);
                vec![SpeechCommand::StartEngine]
            }
            (Listening | Restarting, SpeechEvent::Toggle) => {
                self.preview.clear();
                self.transition(Stopped);
                vec![SpeechCommand::StopEngine]
            }

            (Listening | Restarting, SpeechEvent::EngineStarted) => {
                self.transition(Listening);
                Vec::new()
            }
            // A late start after the user switched off
            (Stopped, SpeechEvent::EngineStarted) => vec![SpeechCommand::StopEngine],

            (Listening | Restarting, SpeechEvent::EngineEnded) => {
                self.transition(Restarting);
                vec![SpeechCommand::StartEngine]
            }
            (Stopped, SpeechEvent::EngineEnded) => Vec::new(),

            (Stopped, SpeechEvent::Transcript { .. }) => Vec::new(),
            (_, SpeechEvent::Transcript { text, is_final }) => {
                if is_final {
                    self.preview.clear();
                    vec![SpeechCommand::Deliver(text)]
                } else {
                    self.preview = text;
                    Vec::new()
                }
            }

            (_, SpeechEvent::EngineError(message)) => {
                warn!(error = %message, state = ?self.state, "speech engine error");
                self.last_error = Some(message);
                Vec::new()
            }
        }
    }

    fn transition(&mut self, next: CaptureState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "speech capture transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(text: &str, is_final: bool) -> SpeechEvent {
        SpeechEvent::Transcript {
            text: text.to_string(),
            is_final,
        }
    }

    #[test]
    fn test_language_from_config() {
        let config = AnnotatorConfig {
            speech_language: "es-MX".to_string(),
            ..Default::default()
        };
        assert_eq!(SpeechCapture::from_config(&config).language(), "es-MX");
        assert_eq!(
            SpeechCapture::from_config(&AnnotatorConfig::default()).language(),
            DEFAULT_SPEECH_LANGUAGE
        );
    }

    #[test]
    fn test_toggle_on_and_off() {
        let mut capture = SpeechCapture::default();
        assert_eq!(capture.language(), "es-419");

        assert_eq!(capture.handle(SpeechEvent::Toggle), vec![SpeechCommand::StartEngine]);
        assert_eq!(capture.state(), CaptureState::Listening);

        assert_eq!(capture.handle(SpeechEvent::Toggle), vec![SpeechCommand::StopEngine]);
        assert_eq!(capture.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_engine_end_restarts_while_listening() {
        let mut capture = SpeechCapture::default();
        capture.handle(SpeechEvent::Toggle);
        capture.handle(SpeechEvent::EngineStarted);

        for _ in 0..3 {
            assert_eq!(
                capture.handle(SpeechEvent::EngineEnded),
                vec![SpeechCommand::StartEngine]
            );
            assert_eq!(capture.state(), CaptureState::Restarting);
            assert!(capture.handle(SpeechEvent::EngineStarted).is_empty());
            assert_eq!(capture.state(), CaptureState::Listening);
        }
    }

    #[test]
    fn test_stopped_ignores_engine_end() {
        let mut capture = SpeechCapture::default();
        capture.handle(SpeechEvent::Toggle);
        capture.handle(SpeechEvent::Toggle);

        assert!(capture.handle(SpeechEvent::EngineEnded).is_empty());
        assert_eq!(capture.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_late_start_is_stopped() {
        let mut capture = SpeechCapture::default();
        assert_eq!(
            capture.handle(SpeechEvent::EngineStarted),
            vec![SpeechCommand::StopEngine]
        );
        assert_eq!(capture.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_only_final_transcripts_are_delivered() {
        let mut capture = SpeechCapture::new("es-MX");
        capture.handle(SpeechEvent::Toggle);

        assert!(capture.handle(transcript("hola", false)).is_empty());
        assert_eq!(capture.preview(), "hola");

        assert_eq!(
            capture.handle(transcript("hola buenas tardes", true)),
            vec![SpeechCommand::Deliver("hola buenas tardes".to_string())]
        );
        assert_eq!(capture.preview(), "");
    }

    #[test]
    fn test_transcripts_ignored_when_stopped() {
        let mut capture = SpeechCapture::default();
        assert!(capture.handle(transcript("hola", true)).is_empty());
        assert!(capture.handle(transcript("hola", false)).is_empty());
        assert_eq!(capture.preview(), "");
    }

    #[test]
    fn test_engine_error_keeps_state() {
        let mut capture = SpeechCapture::default();
        capture.handle(SpeechEvent::Toggle);

        assert!(capture
            .handle(SpeechEvent::EngineError("no-speech".to_string()))
            .is_empty());
        assert_eq!(capture.state(), CaptureState::Listening);
        assert_eq!(capture.last_error(), Some("no-speech"));

        // The engine ends after an error and comes back
        assert_eq!(
            capture.handle(SpeechEvent::EngineEnded),
            vec![SpeechCommand::StartEngine]
        );

        // Cleared on the next fresh start
        capture.handle(SpeechEvent::Toggle);
        capture.handle(SpeechEvent::Toggle);
        assert_eq!(capture.last_error(), None);
    }
}
