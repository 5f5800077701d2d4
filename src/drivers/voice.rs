use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::{Result, TeleopError};

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a speech engine reports back
pub enum VoiceEvent {
    Result(String),
    Error(String),
    /// The engine stopped listening on its own
    End,
}

/// A speech-to-text engine. Events come back on the channel handed to [VoiceRelay::new].
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    async fn start(&self, locale: &str) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Used when the device has no speech engine
pub struct MissingVoice;

#[async_trait]
impl VoiceCapture for MissingVoice {
    async fn start(&self, _locale: &str) -> Result<()> {
        Err(TeleopError::VoiceUnavailable("voice recognition is not available".into()))
    }

    async fn stop(&self) -> Result<()> {
        Err(TeleopError::VoiceUnavailable("voice recognition is not available".into()))
    }
}

/// Forwards record intents to a [VoiceCapture] and keeps the latest transcript.
///
/// The transcript is only displayed, nothing in the controller acts on it.
pub struct VoiceRelay {
    capture: Arc<dyn VoiceCapture>,
    events: flume::Receiver<VoiceEvent>,
    locale: String,
    recording: bool,
    transcript: Option<String>,
    last_error: Option<String>,
}

impl VoiceRelay {
    pub fn new(capture: Arc<dyn VoiceCapture>, events: flume::Receiver<VoiceEvent>, locale: &str) -> VoiceRelay {
        Self {
            capture,
            events,
            locale: locale.to_string(),
            recording: false,
            transcript: None,
            last_error: None,
        }
    }

    /// A relay around [MissingVoice]
    pub fn missing(locale: &str) -> VoiceRelay {
        let (_tx, rx) = flume::unbounded();
        Self::new(Arc::new(MissingVoice), rx, locale)
    }

    pub async fn start(&mut self) -> Result<()> {
        self.transcript = None;
        self.last_error = None;
        if let Err(e) = self.capture.start(&self.locale).await {
            warn!("Could not start recording: {}", e);
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.recording = true;
        info!("Voice recording started ({})", self.locale);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.capture.stop().await {
            warn!("Could not stop recording: {}", e);
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.recording = false;
        info!("Voice recording stopped");
        Ok(())
    }

    /// Applies every event waiting on the channel and returns how many there were
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        for event in self.events.try_iter() {
            match event {
                VoiceEvent::Result(text) => self.transcript = Some(text),
                VoiceEvent::Error(reason) => {
                    self.last_error = Some(reason);
                    self.recording = false;
                }
                VoiceEvent::End => self.recording = false,
            }
            applied += 1;
        }
        applied
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
