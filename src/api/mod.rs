//! Purpose: Remote side of the CLI: REST client, call outcomes, decoded records, probe.
//! Exports: `RemoteClient`, `RepairScheduler`, `RemoteResult`, domain records, `probe`.
//! Role: Everything that talks to the running service goes through this module.
//! Invariants: Callers only ever see `RemoteResult`, never transport errors.

pub mod probe;
mod remote;
mod result;
mod types;

pub use remote::{DEFAULT_BASE_URL, RemoteClient, RepairInfoQuery, RepairScheduler};
pub use result::RemoteResult;
pub use types::{
    OnDemandRepair, RepairInfo, RepairStats, Schedule, ScheduleConfig, VirtualNodeState,
};
