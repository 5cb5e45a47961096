use std::any::Any;
use std::sync::{Arc, RwLock};

use ledgerkeep_core::Result;
use tokio::sync::{mpsc, oneshot};

use crate::errors::StorageError;
use crate::ledger_store::LedgerState;

// A write job gets exclusive access to the ledger state. Jobs must finish all
// of their checks before mutating anything: a job that returns `Err` has to
// leave the state untouched.
type Job<T> = Box<dyn FnOnce(&mut LedgerState) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type ErasedReply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub(crate) struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, ErasedReply)>,
}

impl WriteHandle {
    /// Runs `job` on the writer task and waits for its result.
    pub(crate) async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |state| job(state).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| StorageError::WriterStopped)?;

        let boxed = ret_rx.await.map_err(|_| StorageError::WriterStopped)??;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| StorageError::ResultType.into())
    }
}

/// Spawns the single writer for `state`.
///
/// Must be called from within a Tokio runtime. The task ends once every
/// `WriteHandle` has been dropped.
pub(crate) fn spawn_writer(state: Arc<RwLock<LedgerState>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, ErasedReply)>(1024);

    tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result = match state.write() {
                Ok(mut guard) => job(&mut guard),
                Err(_) => Err(StorageError::LockPoisoned.into()),
            };
            // The requester may have gone away (cancelled pass).
            let _ = reply_tx.send(result);
        }
        log::debug!("Ledger writer stopped");
    });

    WriteHandle { tx }
}
