//! Purpose: Run one query subcommand through gate, validation, remote call and render.
//! Exports: `QueryCommand`, `run_query`, `NOT_RUNNING`.
//! Role: Single dispatch point shared by every remote-facing subcommand.
//! Invariants: The liveness gate runs first; a failed probe stops before any validation.
//! Invariants: Validations run after the gate and before the call; the first failure wins.
//! Invariants: `RemoteResult::Failure` is printed verbatim and is not an error.
use std::io::Write;

use tracing::debug;

use crate::api::{RemoteResult, RepairInfoQuery, RepairScheduler, probe};
use crate::core::error::{Error, ErrorKind};
use crate::core::window;
use crate::render;

pub const NOT_RUNNING: &str = "ecChronos is not running";
pub const RUNNING: &str = "ecChronos is running";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryCommand {
    Repairs {
        keyspace: Option<String>,
        table: Option<String>,
        id: Option<String>,
        host_id: Option<String>,
        limit: i64,
    },
    Schedules {
        keyspace: Option<String>,
        table: Option<String>,
        id: Option<String>,
        full: bool,
        limit: i64,
    },
    RunRepair {
        keyspace: Option<String>,
        table: Option<String>,
        local: bool,
    },
    RepairInfo {
        keyspace: Option<String>,
        table: Option<String>,
        since: Option<String>,
        duration: Option<String>,
        local: bool,
        limit: i64,
    },
    Status,
}

impl QueryCommand {
    pub fn name(&self) -> &'static str {
        match self {
            QueryCommand::Repairs { .. } => "repairs",
            QueryCommand::Schedules { .. } => "schedules",
            QueryCommand::RunRepair { .. } => "run-repair",
            QueryCommand::RepairInfo { .. } => "repair-info",
            QueryCommand::Status => "status",
        }
    }
}

pub fn run_query(
    api: &dyn RepairScheduler,
    command: &QueryCommand,
    out: &mut dyn Write,
) -> Result<(), Error> {
    if !probe::is_reachable(api) {
        return Err(Error::new(ErrorKind::ServiceUnreachable).with_message(NOT_RUNNING));
    }
    debug!(command = command.name(), "liveness gate passed");

    match command {
        QueryCommand::Status => write_text(out, RUNNING),
        QueryCommand::Schedules {
            keyspace,
            table,
            id,
            full,
            limit,
        } => {
            let limit = render::limit_from(*limit);
            if let Some(id) = present(id) {
                let result = api.get_schedule(id, *full);
                return report(out, result, |out, schedule| {
                    render::render_schedule(out, &schedule, limit, *full)
                });
            }
            if *full {
                return Err(invalid("Must specify id with full"));
            }
            let (keyspace, table) = (present(keyspace), present(table));
            if table.is_some() && keyspace.is_none() {
                return Err(invalid("Must specify keyspace"));
            }
            let result = api.list_schedules(keyspace, table);
            report(out, result, |out, schedules| {
                render::render_schedules(out, &schedules, limit)
            })
        }
        QueryCommand::Repairs {
            keyspace,
            table,
            id,
            host_id,
            limit,
        } => {
            let limit = render::limit_from(*limit);
            let host_id = present(host_id);
            let result = if let Some(id) = present(id) {
                api.get_repair(id, host_id)
            } else {
                let (keyspace, table) = (present(keyspace), present(table));
                if table.is_some() && keyspace.is_none() {
                    return Err(invalid("Must specify keyspace"));
                }
                api.list_repairs(keyspace, table, host_id)
            };
            report(out, result, |out, repairs| {
                render::render_repairs(out, &repairs, limit)
            })
        }
        QueryCommand::RunRepair {
            keyspace,
            table,
            local,
        } => {
            let (keyspace, table) = (present(keyspace), present(table));
            require_keyspace_for_table(keyspace, table)?;
            let result = api.trigger_repair(keyspace, table, *local);
            report(out, result, |out, repairs| {
                render::render_repairs(out, &repairs, None)
            })
        }
        QueryCommand::RepairInfo {
            keyspace,
            table,
            since,
            duration,
            local,
            limit,
        } => {
            let (keyspace, table) = (present(keyspace), present(table));
            require_keyspace_for_table(keyspace, table)?;
            let window = window::resolve(since.as_deref(), duration.as_deref())?;
            if let Some(end) = window.end {
                debug!(%end, "duration-only window anchored at dispatch time");
            }
            let query = RepairInfoQuery {
                keyspace,
                table,
                since: window.since.as_deref(),
                duration: window.duration.as_ref().map(|token| token.as_str()),
                local: *local,
            };
            let limit = render::limit_from(*limit);
            let result = api.repair_info(&query);
            report(out, result, |out, info| {
                render::render_repair_info(out, &info, limit)
            })
        }
    }
}

/// Success goes to the renderer; failure is printed and the command still succeeds.
fn report<T>(
    out: &mut dyn Write,
    result: RemoteResult<T>,
    render: impl FnOnce(&mut dyn Write, T) -> std::io::Result<()>,
) -> Result<(), Error> {
    match result {
        RemoteResult::Success(payload) => render(out, payload).map_err(output_error),
        RemoteResult::Failure(cause) => {
            debug!(%cause, "remote call failed");
            write_text(out, &cause)
        }
    }
}

/// Empty flag values count as not given.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn require_keyspace_for_table(keyspace: Option<&str>, table: Option<&str>) -> Result<(), Error> {
    if table.is_some() && keyspace.is_none() {
        return Err(invalid("--keyspace must be specified if table is specified"));
    }
    Ok(())
}

fn invalid(message: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message(message)
}

fn write_text(out: &mut dyn Write, text: &str) -> Result<(), Error> {
    writeln!(out, "{text}").map_err(output_error)
}

fn output_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err)
}
