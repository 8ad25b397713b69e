//! Cloneable front door to a running coordinator

use tokio::sync::{mpsc, oneshot};

use super::coordinator::SessionView;
use super::events::ExchangeId;
use crate::protocol::ChatTurn;
use crate::{Error, Result};

/// Command applied on the coordinator loop
#[derive(Debug)]
pub enum SessionCommand {
    OpenConversation { id: String, turns: Vec<ChatTurn> },
    CloseConversation,
    EnableVoice { reply: oneshot::Sender<Result<()>> },
    DisableVoice,
    ResetTranscript,
    Submit {
        text: String,
        reply: oneshot::Sender<Result<Option<ExchangeId>>>,
    },
    Cancel,
    Snapshot { reply: oneshot::Sender<SessionView> },
}

/// Sends commands to a [`super::SessionCoordinator::run`] loop
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Create a handle and the receiver to pass to `run`
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn open_conversation(&self, id: impl Into<String>, turns: Vec<ChatTurn>) -> Result<()> {
        self.send(SessionCommand::OpenConversation {
            id: id.into(),
            turns,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn close_conversation(&self) -> Result<()> {
        self.send(SessionCommand::CloseConversation).await
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped or voice could not start
    pub async fn enable_voice(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::EnableVoice { reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn disable_voice(&self) -> Result<()> {
        self.send(SessionCommand::DisableVoice).await
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn reset_transcript(&self) -> Result<()> {
        self.send(SessionCommand::ResetTranscript).await
    }

    /// Submit typed text as a new exchange
    ///
    /// # Errors
    ///
    /// Returns error if the coordinator has stopped or rejected the submission
    pub async fn submit(&self, text: impl Into<String>) -> Result<Option<ExchangeId>> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Submit {
            text: text.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn cancel(&self) -> Result<()> {
        self.send(SessionCommand::Cancel).await
    }

    /// # Errors
    ///
    /// Returns error if the coordinator has stopped
    pub async fn snapshot(&self) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }
}

const fn stopped() -> Error {
    Error::SessionClosed
}
