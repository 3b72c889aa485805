//! Shared API objects for the open skill exchange.
//!
//! This crate defines the transport-agnostic request/response types and the
//! WebSocket protocol frames exchanged between the server and its clients.
//! It deliberately contains no engine logic.

pub mod objects;
