//! caverna-report - Capitão Cavernas AI report CLI
//!
//! Generates the narrated dashboard analysis from a metrics snapshot file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use caverna_core::format::format_date_pt_br;
use caverna_core::store::CREDENTIAL_KEY;
use caverna_core::{
    AnalysisRequest, AnalysisResult, AnalysisClient, CommandNarrator, Config, CredentialStore,
    EnvCredentialStore, Error, KvStore, MetricKind, MetricsSnapshot, Period, ReportSession,
};
use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "caverna-report")]
#[command(about = "Capitão Cavernas - AI narrated dashboard report")]
#[command(version)]
struct Args {
    /// Read the API key from $OPENAI_API_KEY instead of the local store
    #[arg(long, global = true)]
    env_key: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the completion API key to the local store
    SetKey {
        /// API key (e.g., sk-...)
        key: String,
    },

    /// Show the configured API key (masked)
    ShowKey,

    /// Remove the saved API key
    ClearKey,

    /// Print the prompt that would be sent, without calling any provider
    Prompt(ReportArgs),

    /// Generate the report
    Analyze {
        #[command(flatten)]
        report: ReportArgs,

        /// Mark the run as automatically triggered
        #[arg(long)]
        auto: bool,

        /// Skip remote speech synthesis
        #[arg(long)]
        no_audio: bool,

        /// Narrate the report after generating it
        #[arg(long)]
        play: bool,

        /// Copy the synthesized audio to this path
        #[arg(long)]
        save_audio: Option<PathBuf>,

        /// Export format (md = markdown, json = JSON)
        #[arg(long)]
        export: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct ReportArgs {
    /// Metrics snapshot (JSON, dashboard field names)
    #[arg(long)]
    snapshot: PathBuf,

    /// Reporting period: daily, weekly, monthly, yearly, alltime
    #[arg(long, default_value_t = Period::Monthly)]
    period: Period,

    /// Comma-separated metric identifiers (default: all)
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,
}

impl ReportArgs {
    fn to_request(&self, auto_mode: bool) -> Result<AnalysisRequest> {
        let metrics = load_snapshot(&self.snapshot)?;
        let selected_metrics = if self.metrics.is_empty() {
            MetricKind::all_ids()
        } else {
            self.metrics.clone()
        };

        for id in &selected_metrics {
            if MetricKind::from_id(id).is_none() {
                eprintln!("warning: unknown metric '{}' will be left blank", id);
            }
        }

        Ok(AnalysisRequest {
            period: self.period,
            metrics,
            selected_metrics,
            auto_mode,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = caverna_core::logging::init(&config.logging).ok();

    match args.command {
        Command::SetKey { key } => {
            let store = open_store()?;
            let client = AnalysisClient::new(&config, store)?;
            client.set_credential(key.trim())?;
            println!("API key saved.");
        }
        Command::ShowKey => {
            let client = AnalysisClient::new(&config, credential_store(args.env_key)?)?;
            match client.get_credential()? {
                Some(credential) => println!("{}", credential),
                None => println!("No API key configured."),
            }
        }
        Command::ClearKey => {
            let store = KvStore::open_migrated(&Config::database_path())
                .context("failed to open credential store")?;
            if store.remove(CREDENTIAL_KEY)? {
                println!("API key removed.");
            } else {
                println!("No API key configured.");
            }
        }
        Command::Prompt(report) => {
            let request = report.to_request(false)?;
            println!("{}", caverna_core::prompt::build_prompt(&request));
        }
        Command::Analyze {
            report,
            auto,
            no_audio,
            play,
            save_audio,
            export,
        } => {
            if let Some(format) = export.as_deref() {
                if format != "md" && format != "json" {
                    anyhow::bail!("Unknown export format: {}. Use 'md' or 'json'", format);
                }
            }

            let request = report.to_request(auto)?;
            let client = AnalysisClient::new(&config, credential_store(args.env_key)?)?;
            let narrator = CommandNarrator::new(config.narrator.clone());
            let mut session = ReportSession::new(client, Arc::new(narrator));
            if no_audio {
                session = session.without_audio();
            } else if !session.client().speech_available() {
                eprintln!("Remote narration unavailable, the fallback narrator will be used.");
            }

            tracing::info!(
                period = %request.period,
                metrics = request.selected_metrics.len(),
                auto,
                "Starting analysis"
            );
            eprintln!("Analisando...");
            let result = match session.run(&request).await {
                Ok(result) => result,
                Err(Error::MissingCredential) => anyhow::bail!(
                    "No API key configured. Run `caverna-report set-key <KEY>` or pass --env-key."
                ),
                Err(e) => {
                    let logs = caverna_core::logging::latest_log_file()
                        .unwrap_or_else(caverna_core::logging::log_dir);
                    return Err(e).with_context(|| {
                        format!("failed to generate analysis (logs: {})", logs.display())
                    });
                }
            };

            match export.as_deref() {
                Some("json") => print_json(result)?,
                Some(_) => print_markdown(result),
                None => print_terminal(result),
            }

            if let (Some(target), Some(audio)) = (save_audio.as_ref(), result.audio.as_ref()) {
                std::fs::copy(audio.path(), target)
                    .with_context(|| format!("failed to save audio to {}", target.display()))?;
                eprintln!("Audio saved to {}", target.display());
            }

            if play {
                let handle = session.playback_handle();
                let playback = session.play();
                tokio::pin!(playback);

                let outcome = tokio::select! {
                    outcome = &mut playback => outcome,
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!("Narration interrupted.");
                        handle.stop().await?;
                        playback.await
                    }
                };
                outcome.context("narration failed")?;
            }
        }
    }

    Ok(())
}

fn open_store() -> Result<Arc<dyn CredentialStore>> {
    let store = KvStore::open_migrated(&Config::database_path())
        .context("failed to open credential store")?;
    Ok(Arc::new(store))
}

fn credential_store(from_env: bool) -> Result<Arc<dyn CredentialStore>> {
    if from_env {
        Ok(Arc::new(EnvCredentialStore::default()))
    } else {
        open_store()
    }
}

fn load_snapshot(path: &Path) -> Result<MetricsSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

fn print_terminal(result: &AnalysisResult) {
    let title = format!("Capitão Cavernas - Análise {}", result.period.display_name());

    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", title);
    println!("╰{}╯", "─".repeat(60));
    println!();
    println!("{}", result.report);
    println!();

    match &result.audio {
        Some(audio) => println!("Áudio: {}", audio.locator()),
        None => println!("Áudio: narração local"),
    }
}

fn print_markdown(result: &AnalysisResult) {
    println!(
        "# Capitão Cavernas - Análise {}",
        result.period.display_name()
    );
    println!();
    println!(
        "_Gerado em {}_",
        format_date_pt_br(&result.generated_at.with_timezone(&Local))
    );
    println!();
    println!("{}", result.report);
}

fn print_json(result: &AnalysisResult) -> Result<()> {
    let value = serde_json::json!({
        "period": result.period,
        "generated_at": result.generated_at.to_rfc3339(),
        "report": result.report,
        "audio": result.audio.as_ref().map(|a| a.locator()),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
