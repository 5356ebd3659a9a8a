//! Spoken answers.
//!
//! [`AudioSession`] owns the one utterance that may be playing. Starting a
//! new utterance always stops the current one first, whichever engine
//! produced it.

use anyhow::Result;
use tracing::info;

use crate::analytics::{Event, EventLog};
use crate::config::schema::VoiceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(pub u64);

/// What to say and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    /// Local synthesizer voice name.
    pub voice: Option<&'a str>,
    /// Use the remote text-to-speech engine.
    pub remote: bool,
}

/// A text-to-speech engine.
pub trait SpeechOutput: Send {
    /// Begin speaking. Returns once playback has started.
    fn play(&mut self, request: &SpeechRequest<'_>) -> Result<UtteranceId>;
    /// Stop an utterance and release its playback resources.
    fn cancel(&mut self, utterance: UtteranceId);
}

impl<S: SpeechOutput + ?Sized> SpeechOutput for Box<S> {
    fn play(&mut self, request: &SpeechRequest<'_>) -> Result<UtteranceId> {
        (**self).play(request)
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        (**self).cancel(utterance)
    }
}

// ---------------------------------------------------------------------------
// Voice preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePrefs {
    pub preferred_voice: Option<String>,
    pub use_remote: bool,
}

impl VoicePrefs {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            preferred_voice: config.preferred_voice.clone(),
            use_remote: config.use_remote_tts,
        }
    }
}

impl Default for VoicePrefs {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Audio session
// ---------------------------------------------------------------------------

pub struct AudioSession<S: SpeechOutput> {
    output: S,
    prefs: VoicePrefs,
    current: Option<UtteranceId>,
}

impl<S: SpeechOutput> AudioSession<S> {
    pub fn new(output: S, prefs: VoicePrefs) -> Self {
        Self {
            output,
            prefs,
            current: None,
        }
    }

    /// Speak `text`, stopping whatever is playing first.
    pub fn start(&mut self, text: &str) -> Result<UtteranceId> {
        self.stop();
        let request = SpeechRequest {
            text,
            voice: self.prefs.preferred_voice.as_deref(),
            remote: self.prefs.use_remote,
        };
        let id = self.output.play(&request)?;
        self.current = Some(id);
        Ok(id)
    }

    /// Stop the current utterance, if any.
    pub fn stop(&mut self) {
        if let Some(id) = self.current.take() {
            self.output.cancel(id);
        }
    }

    /// The engine reports that `utterance` ended on its own.
    pub fn finished(&mut self, utterance: UtteranceId) {
        if self.current == Some(utterance) {
            self.current = None;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current
    }

    pub fn prefs(&self) -> &VoicePrefs {
        &self.prefs
    }

    pub fn set_prefs(&mut self, prefs: VoicePrefs) {
        self.prefs = prefs;
    }

    pub fn output(&self) -> &S {
        &self.output
    }
}

// ---------------------------------------------------------------------------
// Logging engine
// ---------------------------------------------------------------------------

/// Engine for surfaces without audio: each utterance goes to the event log.
#[derive(Debug, Clone, Default)]
pub struct LoggingSpeech {
    log: EventLog,
    next: u64,
}

impl LoggingSpeech {
    pub fn new(log: EventLog) -> Self {
        Self { log, next: 0 }
    }
}

impl SpeechOutput for LoggingSpeech {
    fn play(&mut self, request: &SpeechRequest<'_>) -> Result<UtteranceId> {
        self.next += 1;
        info!(remote = request.remote, chars = request.text.len(), "speaking");
        self.log.record(Event::Utterance {
            text: request.text.to_string(),
            remote: request.remote,
            voice: request.voice.map(str::to_string),
        });
        Ok(UtteranceId(self.next))
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        tracing::debug!(utterance = utterance.0, "utterance cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        next: u64,
        playing: Vec<u64>,
        log: Vec<String>,
    }

    impl SpeechOutput for Recording {
        fn play(&mut self, request: &SpeechRequest<'_>) -> Result<UtteranceId> {
            self.next += 1;
            self.playing.push(self.next);
            self.log.push(format!("play {}", request.text));
            Ok(UtteranceId(self.next))
        }

        fn cancel(&mut self, utterance: UtteranceId) {
            self.playing.retain(|id| *id != utterance.0);
            self.log.push(format!("cancel {}", utterance.0));
        }
    }

    #[test]
    fn start_stops_previous_utterance_first() {
        let mut session = AudioSession::new(Recording::default(), VoicePrefs::default());
        session.start("one").unwrap();
        session.start("two").unwrap();
        assert_eq!(session.output().playing, vec![2]);
        assert_eq!(session.output().log, ["play one", "cancel 1", "play two"]);
    }

    #[test]
    fn finished_clears_only_matching_utterance() {
        let mut session = AudioSession::new(Recording::default(), VoicePrefs::default());
        let first = session.start("one").unwrap();
        let second = session.start("two").unwrap();
        session.finished(first);
        assert!(session.is_playing());
        session.finished(second);
        assert!(!session.is_playing());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut session = AudioSession::new(Recording::default(), VoicePrefs::default());
        session.stop();
        session.start("one").unwrap();
        session.stop();
        session.stop();
        assert_eq!(session.output().log, ["play one", "cancel 1"]);
    }

    #[test]
    fn logging_speech_writes_utterance_events() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::at(dir.path().join("events.jsonl"));
        let mut session = AudioSession::new(
            LoggingSpeech::new(log.clone()),
            VoicePrefs {
                preferred_voice: Some("Samantha".into()),
                use_remote: false,
            },
        );
        session.start("hello").unwrap();
        let entries = log.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].event,
            Event::Utterance {
                text: "hello".into(),
                remote: false,
                voice: Some("Samantha".into()),
            }
        );
    }
}
