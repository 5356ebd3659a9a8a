//! Full voice mode: listen, answer, listen again until switched off.

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::config::schema::VoiceConfig;

pub const ACTIVATED: &str = "Full voice mode activated. I am listening. How can I help you?";
pub const DEACTIVATED: &str = "Voice mode deactivated";

/// Recognition error code for silence, which does not trigger a restart.
pub const NO_SPEECH: &str = "no-speech";

/// A speech-to-text engine.
pub trait Recognizer {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
}

/// Callback from the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Transcript(String),
    End,
    Error(String),
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceAction {
    /// Send the transcript through the assistant with `voice_mode` set.
    Ask(String),
    /// Call [`VoiceLoop::restart`] after this delay.
    RestartAfter(Duration),
    Idle,
}

pub struct VoiceLoop<R: Recognizer> {
    recognizer: R,
    active: bool,
    restart_delay: Duration,
    error_restart_delay: Duration,
}

impl<R: Recognizer> VoiceLoop<R> {
    pub fn new(recognizer: R, config: &VoiceConfig) -> Self {
        Self {
            recognizer,
            active: false,
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            error_restart_delay: Duration::from_millis(config.error_restart_delay_ms),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn recognizer_mut(&mut self) -> &mut R {
        &mut self.recognizer
    }

    /// Switch voice mode on or off. Returns the announcement to speak.
    pub fn toggle(&mut self) -> Result<&'static str> {
        if self.active {
            self.active = false;
            self.recognizer.stop();
            debug!("voice mode off");
            Ok(DEACTIVATED)
        } else {
            self.recognizer.start()?;
            self.active = true;
            debug!("voice mode on");
            Ok(ACTIVATED)
        }
    }

    pub fn handle(&mut self, event: RecognizerEvent) -> VoiceAction {
        if !self.active {
            return VoiceAction::Idle;
        }
        match event {
            RecognizerEvent::Transcript(text) => {
                let text = text.trim();
                if text.is_empty() {
                    VoiceAction::Idle
                } else {
                    VoiceAction::Ask(text.to_string())
                }
            }
            RecognizerEvent::End => VoiceAction::RestartAfter(self.restart_delay),
            RecognizerEvent::Error(code) if code == NO_SPEECH => VoiceAction::Idle,
            RecognizerEvent::Error(code) => {
                debug!(%code, "recognition error");
                VoiceAction::RestartAfter(self.error_restart_delay)
            }
        }
    }

    /// Resume listening after a scheduled delay. Does nothing once voice
    /// mode has been switched off.
    pub fn restart(&mut self) -> Result<bool> {
        if !self.active {
            return Ok(false);
        }
        self.recognizer.start()?;
        Ok(true)
    }
}
