//! Domain models, error taxonomy and pure sync algorithms for ledgersync.

pub mod errors;
pub mod ledger;
pub mod sync;

pub use errors::{Error, Result, SyncErrorCode};
