//! Purpose: Domain records decoded from the repair-management v2 REST API.
//! Exports: `Schedule`, `ScheduleConfig`, `VirtualNodeState`, `OnDemandRepair`, `RepairInfo`, `RepairStats`.
//! Invariants: Field names follow the remote camelCase JSON; unknown fields are ignored.
//! Invariants: Missing fields decode to defaults so partial payloads still render.
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    pub id: String,
    pub keyspace: String,
    pub table: String,
    pub status: String,
    pub repaired_ratio: f64,
    pub last_repaired_at_in_ms: i64,
    pub next_repair_in_ms: i64,
    pub config: ScheduleConfig,
    pub repair_type: String,
    pub virtual_node_states: Option<Vec<VirtualNodeState>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    pub interval_in_ms: i64,
    pub unwind_ratio: f64,
    pub warning_time_in_ms: i64,
    pub error_time_in_ms: i64,
    pub parallelism: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualNodeState {
    pub start_token: i64,
    pub end_token: i64,
    pub replicas: Vec<String>,
    pub last_repaired_at_in_ms: i64,
    pub repaired: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OnDemandRepair {
    pub id: String,
    pub host_id: String,
    pub keyspace: String,
    pub table: String,
    pub status: String,
    pub repaired_ratio: f64,
    pub completed_at: i64,
    pub repair_type: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RepairInfo {
    pub since_in_ms: i64,
    pub to_in_ms: i64,
    pub repair_stats: Vec<RepairStats>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RepairStats {
    pub keyspace: String,
    pub table: String,
    pub repaired_ratio: f64,
    pub repair_time_taken_ms: i64,
}
