//! Self-describing binary log codec for timestamped telemetry streams.
//!
//! A log file carries its own schema: packages are registered with the
//! encoder, serialized into the file head, and rebuilt by the decoder before
//! any record is read. Records are framed, timestamped and checksummed
//! individually, so a truncated or partially corrupt file still yields every
//! intact record.

mod codec;
mod format;

pub use codec::*;
pub use format::*;
