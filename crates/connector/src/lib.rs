//! Client for the connector gateway fronting the remote accounting source.
//!
//! Decodes the gateway's positional row tuples into typed
//! [`ledgersync_core::ledger::LedgerEntry`] values and implements the
//! [`ledgersync_core::sync::RemoteRecordSource`] contract consumed by the
//! sync engine.

mod client;
mod error;
mod row;

pub use client::{GatewayClient, GatewayConfig};
pub use error::{ConnectorError, Result};
pub use row::{decode_row, COLUMN_COUNT};
