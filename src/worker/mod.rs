//! Worker communication module.
//!
//! All target-database I/O goes through an external driver worker process;
//! the engine itself stays database-agnostic. The client spawns the worker
//! as a child process and speaks NDJSON over stdin/stdout, with request
//! ids correlating concurrent requests (chart fan-out runs several at
//! once over one worker).
//!
//! [`WorkerExecutor`] adapts a `(client, connection)` pair to the
//! [`crate::exec::Executor`] seam, tracking the in-flight query id so a
//! deadline can cancel the underlying driver call.

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::exec::{ExecError, Executor, QueryOutput};
use crate::sql::Statement;
use protocol::ConnectionParams;

/// An [`Executor`] bound to one target database over a shared worker.
pub struct WorkerExecutor {
    client: Arc<WorkerClient>,
    connection: ConnectionParams,
    /// Query id of the in-flight call, for cancellation.
    current: Mutex<Option<String>>,
}

impl WorkerExecutor {
    pub fn new(client: Arc<WorkerClient>, connection: ConnectionParams) -> Self {
        Self {
            client,
            connection,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Executor for WorkerExecutor {
    async fn query(&self, statement: &Statement) -> Result<QueryOutput, ExecError> {
        let query_id = uuid::Uuid::new_v4().to_string();
        {
            let mut current = self.current.lock().await;
            *current = Some(query_id.clone());
        }

        let result = self
            .client
            .execute(&self.connection, statement, &query_id)
            .await;

        {
            let mut current = self.current.lock().await;
            *current = None;
        }

        match result {
            Ok(resp) => Ok(QueryOutput {
                columns: resp.columns,
                rows: resp.rows,
            }),
            Err(WorkerError::ConnectionFailed(msg)) => Err(ExecError::Connection(msg)),
            Err(WorkerError::Timeout(secs)) => {
                Err(ExecError::Timeout(std::time::Duration::from_secs(secs)))
            }
            Err(other) => Err(ExecError::Driver(other)),
        }
    }

    async fn cancel(&self) {
        let query_id = {
            let mut current = self.current.lock().await;
            current.take()
        };
        if let Some(query_id) = query_id {
            // Best effort; the deadline error is already on its way out.
            let _ = self.client.cancel(&self.connection, &query_id).await;
        }
    }
}
