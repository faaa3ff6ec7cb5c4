use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voxline::playback::{AudioSink, CpalSink, HeadlessSink};
use voxline::{AudioAsset, Editor, EditorConfig, PlaybackEvent};

#[derive(Parser)]
#[command(name = "voxline")]
#[command(about = "Lay speech clips out on a timeline, play them, export the mix", long_about = None)]
struct Cli {
    /// JSON editor config; defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append the files back to back and export the mixdown.
    Mix {
        files: Vec<PathBuf>,
        /// Seconds of silence between consecutive clips.
        #[arg(long, default_value_t = 0.0)]
        gap: f64,
        /// Output path; the extension is replaced to match the chosen format.
        #[arg(long, default_value = "mix.mp3")]
        output: PathBuf,
    },
    /// Append the files back to back and play them on the default device.
    Play {
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = 0.0)]
        gap: f64,
        /// Timeline offset in seconds to start from.
        #[arg(long, default_value_t = 0.0)]
        from: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Mix { files, gap, output } => {
            let editor = Editor::new(config, Arc::new(HeadlessSink::new()));
            lay_out(&editor, &files, gap).await?;

            let exported = editor.export().await?;
            let path = output.with_extension(exported.format.extension());
            tokio::fs::write(&path, &exported.bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                bytes = exported.bytes.len(),
                compressed = exported.is_compressed(),
                "Export written"
            );
        }
        Commands::Play { files, gap, from } => {
            let sink = CpalSink::open(config.sample_rate)?;
            let editor = Editor::new(config, Arc::new(sink));
            lay_out(&editor, &files, gap).await?;

            let mut events = editor.subscribe();
            if editor.play(from).await.is_none() {
                tracing::warn!("Nothing to play");
                return Ok(());
            }

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(PlaybackEvent::Finished) | Ok(PlaybackEvent::Stopped) => break,
                        Ok(PlaybackEvent::Position(p)) => tracing::debug!(position = p, "Playing"),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        editor.stop();
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Append every file, then space them `gap` seconds apart.
async fn lay_out<S: AudioSink>(editor: &Editor<S>, files: &[PathBuf], gap: f64) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No input files provided");
    }

    let mut ids = Vec::with_capacity(files.len());
    for path in files {
        let asset = load_asset(path).await?;
        let clip = editor
            .append(asset)
            .await
            .with_context(|| format!("adding {}", path.display()))?;
        ids.push(clip.id);
    }
    if gap > 0.0 {
        editor.redistribute(&ids, gap);
    }

    tracing::info!(
        clips = ids.len(),
        total = editor.total_duration(),
        "Timeline ready"
    );
    Ok(())
}

async fn load_asset(path: &Path) -> Result<AudioAsset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let text = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(AudioAsset::new(bytes, None, text, "file"))
}
