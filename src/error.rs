use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Price list problems are fatal at startup: no session can run without prices.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read price list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("price list {path} is missing the `item,price_per_kg` header")]
    MissingHeader { path: PathBuf },

    #[error("price list {path} line {line}: expected `item,price_per_kg`, got `{row}`")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        row: String,
    },

    #[error("price list {path} line {line}: invalid price `{value}`")]
    BadPrice {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// A failed weighing attempt. Recoverable: the session is untouched and
/// the user may simply weigh again.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to open sensor channel: {0}")]
    Open(String),

    #[error("sensor read failed: {0}")]
    Read(#[from] io::Error),

    #[error("sensor returned unparsable reading `{0}`")]
    BadReading(String),

    #[error("sensor channel closed after {got} of {want} readings")]
    ChannelClosed { got: usize, want: usize },
}

/// A failed capture attempt. Recoverable the same way as [`SensorError`].
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("no camera frame available yet")]
    NoFrame,

    #[error("classifier failure: {0}")]
    Inference(String),
}

/// The session already produced a bill; only `reset` is accepted.
#[derive(Debug, Error)]
#[error("session already finalized; reset required before new input")]
pub struct SessionFinalizedError;

/// The session cannot accept a new item or weight right now.
#[derive(Debug, Error)]
pub enum SessionInputError {
    #[error("session already finalized; reset required before new input")]
    Finalized,

    /// One durable effect of the current bill already succeeded. New
    /// input would desync the recorded sale from the session, so the
    /// user must retry finalize (or reset) first.
    #[error("bill partially recorded; retry finalize or reset before changing the sale")]
    RecordingOutstanding,
}

/// A durable side effect of finalization failed. The session stays in
/// `BothSet` and the same finalize may be retried; effects that already
/// succeeded are not re-attempted.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("ledger append failed: {0}")]
    Ledger(#[source] io::Error),

    #[error("receipt write failed: {0}")]
    Receipt(String),

    #[error("receipt {} already exists for this timestamp", .0.display())]
    ReceiptCollision(PathBuf),
}
