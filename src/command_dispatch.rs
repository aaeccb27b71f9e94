//! Purpose: Map parsed `ecctool` subcommands onto library operations.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `start`/`stop` never consult the remote service.
//! Invariants: Every other remote-facing subcommand goes through `dispatch::run_query`.

use super::*;

use ecctool::api::RemoteClient;
use ecctool::core::launch::LaunchSpec;
use ecctool::core::supervisor::{CancelToken, Supervisor};
use ecctool::dispatch::{QueryCommand, run_query};
use super::install_paths::{default_pidfile, install_root};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "ecctool", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Start(args) => {
            let home = install_root()?;
            let pidfile = args.pidfile.unwrap_or_else(|| default_pidfile(&home));
            let spec = LaunchSpec::for_install(&home, args.foreground)?;
            let cancel = CancelToken::new();
            if args.foreground {
                register_cancel_signals(&cancel)?;
            }
            let mut stdout = io::stdout().lock();
            Supervisor::new(pidfile).start(&spec, args.foreground, &mut stdout, &cancel)?;
            Ok(RunOutcome::ok())
        }
        Command::Stop(args) => {
            let pidfile = match args.pidfile {
                Some(pidfile) => pidfile,
                None => default_pidfile(&install_root()?),
            };
            let mut stdout = io::stdout().lock();
            Supervisor::new(pidfile).stop(&mut stdout)?;
            Ok(RunOutcome::ok())
        }
        Command::Repairs(args) => run_remote(
            args.url,
            QueryCommand::Repairs {
                keyspace: args.keyspace,
                table: args.table,
                id: args.id,
                host_id: args.host_id,
                limit: args.limit,
            },
        ),
        Command::Schedules(args) => run_remote(
            args.url,
            QueryCommand::Schedules {
                keyspace: args.keyspace,
                table: args.table,
                id: args.id,
                full: args.full,
                limit: args.limit,
            },
        ),
        Command::RunRepair(args) => run_remote(
            args.url,
            QueryCommand::RunRepair {
                keyspace: args.keyspace,
                table: args.table,
                local: args.local,
            },
        ),
        Command::RepairInfo(args) => run_remote(
            args.url,
            QueryCommand::RepairInfo {
                keyspace: args.keyspace,
                table: args.table,
                since: args.since,
                duration: args.duration,
                local: args.local,
                limit: args.limit,
            },
        ),
        Command::Status(args) => run_remote(args.url, QueryCommand::Status),
    }
}

fn run_remote(url: UrlArg, query: QueryCommand) -> Result<RunOutcome, Error> {
    let client = RemoteClient::from_option(url.url.as_deref())?;
    let mut stdout = io::stdout().lock();
    run_query(&client, &query, &mut stdout)?;
    Ok(RunOutcome::ok())
}

/// First signal cancels the foreground relay; a second one exits immediately.
fn register_cancel_signals(cancel: &CancelToken) -> Result<(), Error> {
    for signal in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register_conditional_shutdown(*signal, 1, cancel.flag())
            .and_then(|_| signal_hook::flag::register(*signal, cancel.flag()))
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to install signal handler")
                    .with_source(err)
            })?;
    }
    Ok(())
}
