//! A wire-compatible in-memory key/value server.
//!
//! Speaks the text-framed array protocol used by Redis clients and
//! supports:
//!
//! - String operations (GET, SET with millisecond expiry, INCR)
//! - Stream operations (XADD, XRANGE, XREAD with blocking reads)
//! - Transactions (MULTI, EXEC, DISCARD)
//! - Introspection (PING, ECHO, TYPE, KEYS, INFO, CONFIG GET)
//! - Single-master asynchronous replication (PSYNC full resync, verbatim
//!   write propagation, REPLCONF ACK accounting, WAIT)
//! - Seeding the store from a binary snapshot file at startup
//!
//! Connections are handled concurrently with Tokio, one task per socket,
//! over shared state behind async locks.

pub mod commands;
pub mod connection;
pub mod handshake;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod store;
