use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::database::{
    format::BulkEvent,
    mysql::batch_operations::{BatchError, BulkInsertPlan, BulkStatement},
};

/// A single database connection able to run a rendered bulk statement.
///
/// Implemented on top of whatever MySQL client the host pipeline uses.
#[async_trait]
pub trait BulkConnection: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the statement and returns the number of affected rows.
    async fn execute(&mut self, statement: &BulkStatement) -> Result<u64, Self::Error>;

    async fn close(&mut self) -> Result<(), Self::Error>;
}

/// Opens a fresh connection for every batch.
#[async_trait]
pub trait BulkConnector: Send + Sync {
    type Connection: BulkConnection;

    async fn connect(
        &self,
    ) -> Result<Self::Connection, <Self::Connection as BulkConnection>::Error>;
}

pub type ConnectorError<C> = <<C as BulkConnector>::Connection as BulkConnection>::Error;

#[derive(thiserror::Error, Debug)]
pub enum BulkWriteError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("Can not connect to the database: {0}")]
    Connection(#[source] E),

    #[error("{0}")]
    Execution(#[source] E),
}

/// Writes one batch: prepare the statement, connect, execute, and always close the connection.
///
/// Returns the affected row count. An empty batch never opens a connection. Connection and
/// execution errors are handed back untouched so the caller can decide whether to retry the
/// batch. A failure to close after a successful execute is only logged, the rows are written.
pub async fn write_bulk<C>(
    connector: &C,
    plan: &BulkInsertPlan,
    events: &[BulkEvent],
) -> Result<u64, BulkWriteError<ConnectorError<C>>>
where
    C: BulkConnector,
{
    let Some(statement) = plan.prepare(events)? else {
        return Ok(0);
    };

    let mut connection = connector.connect().await.map_err(|e| {
        error!("{} - Can not connect to the database: {}", plan.table, e);
        BulkWriteError::Connection(e)
    })?;

    info!("bulk insert values size => {}", statement.row_count);

    let result = connection.execute(&statement).await;

    if let Err(e) = connection.close().await {
        warn!("{} - Could not close database connection: {}", plan.table, e);
    }

    result.map_err(|e| {
        error!("{} - Bulk insert failed: {}", plan.table, e);
        BulkWriteError::Execution(e)
    })
}
