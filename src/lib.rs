//! Purpose: Library crate backing the `ecctool` operator CLI and its tests.
//! Exports: `api` (REST client, results, records, probe), `core` (errors, windows, supervision),
//! `dispatch` (query pipeline), `render` (text tables).
//! Role: Internal library; the binary only parses arguments and wires these together.
//! Invariants: Lifecycle operations take their PID file path explicitly.
//! Invariants: Query paths depend on `api::RepairScheduler`, never on a concrete client.
pub mod api;
pub mod core;
pub mod dispatch;
pub mod render;
