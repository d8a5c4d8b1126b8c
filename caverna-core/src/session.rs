//! Report session: one analysis cycle plus playback.
//!
//! ## Cycle
//!
//! ```text
//! Idle -> Requesting -> Succeeded(AudioPending -> AudioReady | AudioUnavailable)
//!                    \-> Failed
//! ```
//!
//! Audio is only requested after the report succeeded. A failed cycle keeps
//! the last successful result available.
//!
//! ## Playback
//!
//! `Stopped <-> Playing`, toggled by the user and forced back to `Stopped`
//! when narration completes. Reports without remote audio are spoken by the
//! fallback narrator.

use std::sync::{Arc, Mutex};

use crate::audio::AudioOutcome;
use crate::client::AnalysisClient;
use crate::error::{Error, Result};
use crate::narrator::Narrator;
use crate::types::{AnalysisRequest, AnalysisResult};

/// State of the current analysis cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Requesting,
    Succeeded(AudioState),
    /// Carries the user-facing error message
    Failed(String),
}

/// Audio sub-state of a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Pending,
    Ready,
    /// Not an error: playback uses the fallback narrator
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Cloneable handle that can stop narration from another task.
#[derive(Clone)]
pub struct PlaybackHandle {
    narrator: Arc<dyn Narrator>,
    playback: Arc<Mutex<PlaybackState>>,
}

impl PlaybackHandle {
    pub fn state(&self) -> PlaybackState {
        *self.playback.lock().unwrap()
    }

    /// Interrupt narration. A no-op while stopped.
    pub async fn stop(&self) -> Result<()> {
        if self.state() == PlaybackState::Stopped {
            return Ok(());
        }

        self.narrator.stop().await?;
        *self.playback.lock().unwrap() = PlaybackState::Stopped;
        tracing::debug!("Playback stopped");
        Ok(())
    }
}

/// Drives analysis cycles and narration for one host.
///
/// Cycles need `&mut self`; playback only needs `&self`, so [`stop`](Self::stop)
/// and [`toggle_playback`](Self::toggle_playback) can run while
/// [`play`](Self::play) is pending.
pub struct ReportSession {
    client: AnalysisClient,
    narrator: Arc<dyn Narrator>,
    fetch_audio: bool,
    state: CycleState,
    playback: Arc<Mutex<PlaybackState>>,
    result: Option<AnalysisResult>,
}

impl ReportSession {
    pub fn new(client: AnalysisClient, narrator: Arc<dyn Narrator>) -> Self {
        Self {
            client,
            narrator,
            fetch_audio: true,
            state: CycleState::Idle,
            playback: Arc::new(Mutex::new(PlaybackState::Stopped)),
            result: None,
        }
    }

    /// Skip remote synthesis; playback always uses the fallback narrator.
    pub fn without_audio(mut self) -> Self {
        self.fetch_audio = false;
        self
    }

    pub fn client(&self) -> &AnalysisClient {
        &self.client
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn playback(&self) -> PlaybackState {
        *self.playback.lock().unwrap()
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        PlaybackHandle {
            narrator: Arc::clone(&self.narrator),
            playback: Arc::clone(&self.playback),
        }
    }

    /// Last successful result, if any.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Run one analysis cycle.
    ///
    /// On failure the error is returned, the state becomes `Failed` and the
    /// previous result is left in place.
    pub async fn run(&mut self, request: &AnalysisRequest) -> Result<&AnalysisResult> {
        self.transition(CycleState::Requesting);

        let mut result = match self.client.request_analysis(request).await {
            Ok(result) => result,
            Err(e) => {
                self.transition(CycleState::Failed(e.to_string()));
                return Err(e);
            }
        };

        self.transition(CycleState::Succeeded(AudioState::Pending));

        let outcome = if self.fetch_audio {
            self.client.request_audio(&result.report).await
        } else {
            AudioOutcome::Unavailable
        };

        match outcome {
            AudioOutcome::Ready(resource) => {
                result.audio = Some(resource);
                self.transition(CycleState::Succeeded(AudioState::Ready));
            }
            AudioOutcome::Unavailable => {
                self.transition(CycleState::Succeeded(AudioState::Unavailable));
            }
        }

        *self.playback.lock().unwrap() = PlaybackState::Stopped;
        Ok(self.result.insert(result))
    }

    /// Narrate the current result until it finishes or is stopped.
    ///
    /// Remote audio is played when present; otherwise, or if the player fails,
    /// the report text is spoken by the fallback narrator.
    pub async fn play(&self) -> Result<()> {
        let Some(result) = self.result.as_ref() else {
            return Err(Error::Narrator("no report available to play".to_string()));
        };

        {
            let mut playback = self.playback.lock().unwrap();
            if *playback == PlaybackState::Playing {
                return Ok(());
            }
            *playback = PlaybackState::Playing;
        }
        tracing::debug!("Playback started");

        let outcome = match &result.audio {
            Some(resource) => match self.narrator.play_resource(resource).await {
                Ok(()) => Ok(()),
                Err(e) if self.playback() == PlaybackState::Playing => {
                    tracing::warn!(error = %e, "Audio playback failed, speaking report instead");
                    self.narrator.speak(&result.report).await
                }
                Err(e) => Err(e),
            },
            None => self.narrator.speak(&result.report).await,
        };

        *self.playback.lock().unwrap() = PlaybackState::Stopped;
        tracing::debug!("Playback finished");
        outcome
    }

    /// Stop narration.
    pub async fn stop(&self) -> Result<()> {
        self.playback_handle().stop().await
    }

    /// Toggle playback: stop if playing, otherwise play to completion.
    pub async fn toggle_playback(&self) -> Result<()> {
        match self.playback() {
            PlaybackState::Playing => self.stop().await,
            PlaybackState::Stopped => self.play().await,
        }
    }

    fn transition(&mut self, next: CycleState) {
        tracing::debug!(from = ?self.state, to = ?next, "Analysis cycle transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioResource;
    use crate::config::Config;
    use crate::store::MemoryCredentialStore;
    use crate::types::{MetricsSnapshot, Period};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingNarrator {
        calls: Arc<Mutex<Vec<String>>>,
        fail_player: bool,
    }

    #[async_trait]
    impl Narrator for RecordingNarrator {
        async fn speak(&self, text: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("speak:{}", text));
            Ok(())
        }

        async fn play_resource(&self, resource: &AudioResource) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("play:{}", resource.format()));
            if self.fail_player {
                return Err(Error::Narrator("player missing".to_string()));
            }
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.calls.lock().unwrap().push("stop".to_string());
            Ok(())
        }
    }

    /// Narrates until stopped.
    #[derive(Default)]
    struct BlockingNarrator {
        started: Arc<Notify>,
        release: Notify,
        stops: AtomicUsize,
    }

    impl BlockingNarrator {
        async fn block(&self) -> Result<()> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[async_trait]
    impl Narrator for BlockingNarrator {
        async fn speak(&self, _text: &str) -> Result<()> {
            self.block().await
        }

        async fn play_resource(&self, _resource: &AudioResource) -> Result<()> {
            self.block().await
        }

        async fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.release.notify_one();
            Ok(())
        }
    }

    fn session(narrator: impl Narrator + 'static) -> ReportSession {
        let client = AnalysisClient::new(
            &Config::default(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        ReportSession::new(client, Arc::new(narrator))
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            period: Period::Weekly,
            metrics: MetricsSnapshot::default(),
            selected_metrics: vec!["activeUsers".to_string()],
            auto_mode: false,
        }
    }

    fn stored_result(session: &mut ReportSession, audio: Option<AudioResource>) {
        session.result = Some(AnalysisResult {
            report: "Relatório".to_string(),
            audio,
            period: Period::Weekly,
            generated_at: chrono::Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_missing_credential_fails_cycle() {
        let mut session = session(RecordingNarrator::default());
        assert_eq!(session.state(), &CycleState::Idle);

        let err = session.run(&request()).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential));
        assert!(matches!(session.state(), CycleState::Failed(_)));
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_result() {
        let mut session = session(RecordingNarrator::default());
        stored_result(&mut session, None);

        assert!(session.run(&request()).await.is_err());
        assert_eq!(session.result().unwrap().report, "Relatório");
    }

    #[tokio::test]
    async fn test_play_without_result_is_error() {
        let session = session(RecordingNarrator::default());
        assert!(matches!(session.play().await, Err(Error::Narrator(_))));
        assert_eq!(session.playback(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_play_falls_back_to_speech_without_audio() {
        let narrator = RecordingNarrator::default();
        let calls = narrator.calls.clone();
        let mut session = session(narrator);
        stored_result(&mut session, None);

        session.toggle_playback().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["speak:Relatório".to_string()]);
        assert_eq!(session.playback(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_play_uses_remote_audio() {
        let narrator = RecordingNarrator::default();
        let calls = narrator.calls.clone();
        let mut session = session(narrator);
        let audio = AudioResource::from_bytes(b"mp3", "mp3").unwrap();
        stored_result(&mut session, Some(audio));

        session.play().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["play:mp3".to_string()]);
        assert_eq!(session.playback(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_player_failure_speaks_instead() {
        let narrator = RecordingNarrator {
            fail_player: true,
            ..Default::default()
        };
        let calls = narrator.calls.clone();
        let mut session = session(narrator);
        let audio = AudioResource::from_bytes(b"mp3", "mp3").unwrap();
        stored_result(&mut session, Some(audio));

        session.play().await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["play:mp3".to_string(), "speak:Relatório".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stop_from_another_task_ends_playback() {
        let narrator = BlockingNarrator::default();
        let started = narrator.started.clone();
        let mut session = session(narrator);
        stored_result(&mut session, None);

        let handle = session.playback_handle();
        let stopper = tokio::spawn(async move {
            started.notified().await;
            assert_eq!(handle.state(), PlaybackState::Playing);
            handle.stop().await
        });

        session.play().await.unwrap();
        stopper.await.unwrap().unwrap();
        assert_eq!(session.playback(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_toggle_while_playing_stops() {
        let narrator = Arc::new(BlockingNarrator::default());
        let started = narrator.started.clone();
        let client = AnalysisClient::new(
            &Config::default(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let mut session = ReportSession::new(client, narrator.clone());
        let audio = AudioResource::from_bytes(b"mp3", "mp3").unwrap();
        stored_result(&mut session, Some(audio));

        let (played, toggled) = tokio::join!(session.play(), async {
            started.notified().await;
            assert_eq!(session.playback(), PlaybackState::Playing);
            session.toggle_playback().await
        });

        played.unwrap();
        toggled.unwrap();
        assert_eq!(narrator.stops.load(Ordering::SeqCst), 1);
        assert_eq!(session.playback(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_while_stopped_is_noop() {
        let narrator = Arc::new(BlockingNarrator::default());
        let client = AnalysisClient::new(
            &Config::default(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap();
        let session = ReportSession::new(client, narrator.clone());

        session.stop().await.unwrap();
        assert_eq!(narrator.stops.load(Ordering::SeqCst), 0);
    }
}
