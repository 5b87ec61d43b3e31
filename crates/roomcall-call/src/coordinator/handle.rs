//! Handle to a running call.

use roomcall_common::{CallError, ParticipantId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::types::{CallCommand, PeerSummary};

/// Sends commands to the coordinator's event loop.
pub struct CallHandle {
    pub(crate) command_tx: mpsc::Sender<CallCommand>,
    pub(crate) local_id: ParticipantId,
    pub(crate) task: JoinHandle<()>,
}

impl CallHandle {
    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// A sender for tasks that issue commands on their own, such as an
    /// input reader.
    pub fn sender(&self) -> mpsc::Sender<CallCommand> {
        self.command_tx.clone()
    }

    pub async fn send(&self, command: CallCommand) -> Result<(), CallError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| CallError::Other("call has ended".into()))
    }

    pub async fn peers(&self) -> Result<Vec<PeerSummary>, CallError> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::QueryPeers(tx)).await?;
        rx.await
            .map_err(|_| CallError::Other("call has ended".into()))
    }

    /// End the call and wait until every local resource is released.
    pub async fn end(self) -> Result<(), CallError> {
        let _ = self.command_tx.send(CallCommand::EndCall).await;
        self.task
            .await
            .map_err(|e| CallError::Other(format!("call task failed: {e}")))
    }

    /// Wait for the call to end without ending it.
    pub async fn wait(self) -> Result<(), CallError> {
        self.task
            .await
            .map_err(|e| CallError::Other(format!("call task failed: {e}")))
    }
}
