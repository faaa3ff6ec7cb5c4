//! Message-passing entry point to an editor.
//!
//! Collaborators (player UI, batch import, synthesis callbacks) hold an
//! `EditorHandle` instead of reaching into the editor directly. Commands are
//! applied one at a time in arrival order.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::session::Editor;
use crate::asset::AudioAsset;
use crate::error::{Error, Result};
use crate::export::ExportedAudio;
use crate::playback::{AudioSink, SessionStart};
use crate::timeline::{Clip, ClipId, ClipSummary};

#[derive(Debug)]
pub enum EditorCommand {
    Append { asset: AudioAsset, reply: oneshot::Sender<Result<Clip>> },
    InsertAt { asset: AudioAsset, start: f64, reply: oneshot::Sender<Result<Clip>> },
    Reposition { clip: ClipId, start: f64, reply: oneshot::Sender<Option<Clip>> },
    Remove { clips: Vec<ClipId>, reply: oneshot::Sender<usize> },
    Redistribute { clips: Vec<ClipId>, gap: f64, reply: oneshot::Sender<()> },
    Play { from: f64, reply: oneshot::Sender<Option<SessionStart>> },
    Stop { reply: oneshot::Sender<()> },
    Seek { to: f64, reply: oneshot::Sender<Option<SessionStart>> },
    Export { reply: oneshot::Sender<Result<ExportedAudio>> },
    Snapshot { reply: oneshot::Sender<Vec<ClipSummary>> },
}

impl EditorCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            EditorCommand::Append { .. } => "append",
            EditorCommand::InsertAt { .. } => "insert_at",
            EditorCommand::Reposition { .. } => "reposition",
            EditorCommand::Remove { .. } => "remove",
            EditorCommand::Redistribute { .. } => "redistribute",
            EditorCommand::Play { .. } => "play",
            EditorCommand::Stop { .. } => "stop",
            EditorCommand::Seek { .. } => "seek",
            EditorCommand::Export { .. } => "export",
            EditorCommand::Snapshot { .. } => "snapshot",
        }
    }
}

impl<S: AudioSink> Editor<S> {
    /// Move the editor onto its own task. It runs until every handle is dropped.
    pub fn spawn(self) -> (EditorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config().command_buffer);
        let task = tokio::spawn(self.run(rx));
        (EditorHandle { tx }, task)
    }

    pub async fn run(self, mut commands: mpsc::Receiver<EditorCommand>) {
        info!("Editor command loop started");
        while let Some(command) = commands.recv().await {
            self.apply(command).await;
        }
        self.stop();
        info!("Editor command loop finished");
    }

    async fn apply(&self, command: EditorCommand) {
        debug!(command = command.kind(), "Editor command");
        // A dropped reply receiver just means the caller stopped waiting.
        match command {
            EditorCommand::Append { asset, reply } => {
                let _ = reply.send(self.append(asset).await);
            }
            EditorCommand::InsertAt { asset, start, reply } => {
                let _ = reply.send(self.insert_at(asset, start).await);
            }
            EditorCommand::Reposition { clip, start, reply } => {
                let _ = reply.send(self.reposition(clip, start));
            }
            EditorCommand::Remove { clips, reply } => {
                let _ = reply.send(self.remove(&clips));
            }
            EditorCommand::Redistribute { clips, gap, reply } => {
                self.redistribute(&clips, gap);
                let _ = reply.send(());
            }
            EditorCommand::Play { from, reply } => {
                let _ = reply.send(self.play(from).await);
            }
            EditorCommand::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            EditorCommand::Seek { to, reply } => {
                let _ = reply.send(self.seek(to).await);
            }
            EditorCommand::Export { reply } => {
                let _ = reply.send(self.export().await);
            }
            EditorCommand::Snapshot { reply } => {
                let _ = reply.send(self.clips().iter().map(ClipSummary::from).collect());
            }
        }
    }
}

/// Cloneable sender side of an editor's command loop.
#[derive(Debug, Clone)]
pub struct EditorHandle {
    tx: mpsc::Sender<EditorCommand>,
}

impl EditorHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> EditorCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| Error::Closed)?;
        response.await.map_err(|_| Error::Closed)
    }

    pub async fn append(&self, asset: AudioAsset) -> Result<Clip> {
        self.request(|reply| EditorCommand::Append { asset, reply }).await?
    }

    pub async fn insert_at(&self, asset: AudioAsset, start: f64) -> Result<Clip> {
        self.request(|reply| EditorCommand::InsertAt { asset, start, reply }).await?
    }

    pub async fn reposition(&self, clip: ClipId, start: f64) -> Result<Option<Clip>> {
        self.request(|reply| EditorCommand::Reposition { clip, start, reply }).await
    }

    pub async fn remove(&self, clips: Vec<ClipId>) -> Result<usize> {
        self.request(|reply| EditorCommand::Remove { clips, reply }).await
    }

    pub async fn redistribute(&self, clips: Vec<ClipId>, gap: f64) -> Result<()> {
        self.request(|reply| EditorCommand::Redistribute { clips, gap, reply }).await
    }

    pub async fn play(&self, from: f64) -> Result<Option<SessionStart>> {
        self.request(|reply| EditorCommand::Play { from, reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| EditorCommand::Stop { reply }).await
    }

    pub async fn seek(&self, to: f64) -> Result<Option<SessionStart>> {
        self.request(|reply| EditorCommand::Seek { to, reply }).await
    }

    pub async fn export(&self) -> Result<ExportedAudio> {
        self.request(|reply| EditorCommand::Export { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<Vec<ClipSummary>> {
        self.request(|reply| EditorCommand::Snapshot { reply }).await
    }
}
