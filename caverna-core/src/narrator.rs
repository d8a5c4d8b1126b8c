//! Narration capability supplied by the host.
//!
//! The pipeline never plays audio itself. Hosts hand a [`Narrator`] to the
//! [`ReportSession`](crate::session::ReportSession); both operations resolve
//! when playback has finished (or was stopped).

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Notify;

use crate::audio::AudioResource;
use crate::config::NarratorConfig;
use crate::error::{Error, Result};

/// Words per minute at rate 1.0 for espeak-style synthesizers.
const BASE_WORDS_PER_MINUTE: f64 = 175.0;

/// Neutral pitch on espeak's 0-99 scale.
const BASE_PITCH: f64 = 50.0;

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speak `text` with the on-device synthesizer.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Play a synthesized audio resource.
    async fn play_resource(&self, resource: &AudioResource) -> Result<()>;

    /// Interrupt whatever is currently playing.
    async fn stop(&self) -> Result<()>;
}

/// Narrator that shells out to system commands.
///
/// `speech_command` receives rate, pitch and the text; `player` receives the
/// audio file path.
pub struct CommandNarrator {
    config: NarratorConfig,
    stop_signal: Notify,
}

impl CommandNarrator {
    pub fn new(config: NarratorConfig) -> Self {
        Self {
            config,
            stop_signal: Notify::new(),
        }
    }

    /// Arguments for the speech command, scaled by rate and pitch.
    pub fn speech_args(&self, text: &str) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * self.config.rate).round() as u32;

        if command_name(&self.config.speech_command) == "say" {
            // macOS `say` has no pitch flag.
            return vec!["-r".to_string(), wpm.to_string(), text.to_string()];
        }

        let pitch = (BASE_PITCH * self.config.pitch).round().clamp(0.0, 99.0) as u32;
        vec![
            "-s".to_string(),
            wpm.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            text.to_string(),
        ]
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<()> {
        // Register for the stop signal before the child exists so a stop issued
        // while it starts up is not missed.
        let stopped = self.stop_signal.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Narrator(format!("failed to start {}: {}", program, e)))?;

        tokio::select! {
            status = child.wait() => check_status(program, status?),
            _ = &mut stopped => {
                tracing::debug!(program, "Narration stopped");
                child.kill().await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::info!(command = %self.config.speech_command, "Speaking report with fallback narrator");
        let args = self.speech_args(text);
        self.run(&self.config.speech_command, &args).await
    }

    async fn play_resource(&self, resource: &AudioResource) -> Result<()> {
        let (program, rest) = self
            .config
            .player
            .split_first()
            .ok_or_else(|| Error::Config("narrator.player must name a command".to_string()))?;

        let mut args = rest.to_vec();
        args.push(resource.path().display().to_string());

        tracing::info!(player = %program, "Playing synthesized audio");
        self.run(program, &args).await
    }

    async fn stop(&self) -> Result<()> {
        self.stop_signal.notify_waiters();
        Ok(())
    }
}

fn command_name(command: &str) -> &str {
    Path::new(command)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(command)
}

fn check_status(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::Narrator(format!("{} exited with {}", program, status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn narrator(speech_command: &str) -> CommandNarrator {
        CommandNarrator::new(NarratorConfig {
            speech_command: speech_command.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_espeak_args_scale_rate_and_pitch() {
        let args = narrator("espeak").speech_args("Olá");
        assert_eq!(args, vec!["-s", "158", "-p", "40", "Olá"]);
    }

    #[test]
    fn test_say_args() {
        let args = narrator("/usr/bin/say").speech_args("Olá");
        assert_eq!(args, vec!["-r", "158", "Olá"]);
    }

    #[tokio::test]
    async fn test_missing_command_is_narrator_error() {
        let narrator = narrator("caverna-no-such-synthesizer");
        let err = narrator.speak("Olá").await.unwrap_err();
        assert!(matches!(err, Error::Narrator(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_play_resource_runs_player_with_path() {
        let narrator = CommandNarrator::new(NarratorConfig {
            player: vec!["test".to_string(), "-f".to_string()],
            ..Default::default()
        });
        let resource = AudioResource::from_bytes(b"audio", "mp3").unwrap();
        narrator.play_resource(&resource).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_running_player() {
        let narrator = Arc::new(CommandNarrator::new(NarratorConfig {
            player: vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()],
            ..Default::default()
        }));

        let player = {
            let narrator = Arc::clone(&narrator);
            tokio::spawn(async move {
                let resource = AudioResource::from_bytes(b"audio", "mp3")?;
                narrator.play_resource(&resource).await
            })
        };

        let stopped = tokio::time::timeout(Duration::from_secs(10), async {
            while !player.is_finished() {
                narrator.stop().await.unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        assert!(stopped.is_ok(), "player was not stopped");
        player.await.unwrap().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_player_is_reported() {
        let narrator = CommandNarrator::new(NarratorConfig {
            player: vec!["false".to_string()],
            ..Default::default()
        });
        let resource = AudioResource::from_bytes(b"audio", "mp3").unwrap();
        assert!(matches!(
            narrator.play_resource(&resource).await,
            Err(Error::Narrator(_))
        ));
    }
}
