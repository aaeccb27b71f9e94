//! Purpose: `ecctool` CLI entry point.
//! Role: Binary crate root; parses args, runs one subcommand, maps errors to exit codes.
//! Invariants: Operator-facing results and fatal messages go to stdout; logs go to stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
//! Invariants: Remote failures on query subcommands are printed and still exit 0.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use ecctool::core::error::{Error, ErrorKind, to_exit_code};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod install_paths;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run<I>(args: I) -> Result<RunOutcome, Error>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            err.print().map_err(|io_err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write usage")
                    .with_source(io_err)
            })?;
            let exit_code = match err.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
                _ => to_exit_code(ErrorKind::Usage),
            };
            return Ok(RunOutcome::with_code(exit_code));
        }
    };

    command_dispatch::dispatch_command(cli.command)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{err}");
    if let Some(hint) = err.hint() {
        let _ = writeln!(stdout, "hint: {hint}");
    }
    let _ = stdout.flush();
}

#[derive(Parser)]
#[command(
    name = "ecctool",
    version,
    about = "ecChronos utility command",
    long_about = None,
    after_help = r#"EXAMPLES
  $ ecctool start                          # launch the service in the background
  $ ecctool status
  $ ecctool schedules -k ks1 -t tbl1
  $ ecctool repair-info -k ks1 -d 1d       # repairs during the last day
  $ ecctool stop

ENVIRONMENT
  ECCHRONOS_HOME   Installation directory (default: parent of the bin/ directory)
  RUST_LOG         Log filter for diagnostics on stderr (default: warn)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show status of triggered repairs")]
    Repairs(RepairsArgs),
    #[command(about = "Show status of schedules")]
    Schedules(SchedulesArgs),
    #[command(name = "run-repair", about = "Run a single repair on a table")]
    RunRepair(RunRepairArgs),
    #[command(name = "repair-info", about = "Show information about repairs per table")]
    RepairInfo(RepairInfoArgs),
    #[command(about = "Start ecChronos service")]
    Start(StartArgs),
    #[command(about = "Stop ecChronos service")]
    Stop(StopArgs),
    #[command(about = "Show status of ecChronos service")]
    Status(StatusArgs),
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct UrlArg {
    #[arg(
        short = 'u',
        long,
        help = "The host to connect to with the format (http://<host>:port)",
        value_hint = ValueHint::Url
    )]
    url: Option<String>,
}

#[derive(Args)]
struct RepairsArgs {
    #[arg(short = 'k', long, help = "Print status(es) for a specific keyspace")]
    keyspace: Option<String>,
    #[arg(
        short = 't',
        long,
        help = "Print status(es) for a specific table (Must be specified with keyspace)"
    )]
    table: Option<String>,
    #[command(flatten)]
    url: UrlArg,
    #[arg(short = 'i', long, help = "Print status for a specific repair")]
    id: Option<String>,
    #[arg(
        short = 'l',
        long,
        default_value_t = -1,
        allow_negative_numbers = true,
        help = "Limit the number of tables or virtual nodes printed (-1 to disable)"
    )]
    limit: i64,
    #[arg(long = "hostid", help = "Show repairs for the specified host id")]
    host_id: Option<String>,
}

#[derive(Args)]
struct SchedulesArgs {
    #[arg(short = 'k', long, help = "Print status(es) for a specific keyspace")]
    keyspace: Option<String>,
    #[arg(
        short = 't',
        long,
        help = "Print status(es) for a specific table (Must be specified with keyspace)"
    )]
    table: Option<String>,
    #[command(flatten)]
    url: UrlArg,
    #[arg(short = 'i', long, help = "Print status for a specific schedule")]
    id: Option<String>,
    #[arg(
        short = 'f',
        long,
        help = "Print all information for a specific job (Can only be used with id)"
    )]
    full: bool,
    #[arg(
        short = 'l',
        long,
        default_value_t = -1,
        allow_negative_numbers = true,
        help = "Limit the number of tables or virtual nodes printed (-1 to disable)"
    )]
    limit: i64,
}

#[derive(Args)]
struct RunRepairArgs {
    #[command(flatten)]
    url: UrlArg,
    #[arg(long, help = "Repair will run for the local node, disabled by default")]
    local: bool,
    #[arg(short = 'k', long, help = "Keyspace where the repair should be triggered")]
    keyspace: Option<String>,
    #[arg(short = 't', long, help = "Table where the repair should be triggered")]
    table: Option<String>,
}

#[derive(Args)]
struct RepairInfoArgs {
    #[arg(short = 'k', long, help = "Print status(es) for a specific keyspace")]
    keyspace: Option<String>,
    #[arg(
        short = 't',
        long,
        help = "Print status(es) for a specific table (Must be specified with keyspace)"
    )]
    table: Option<String>,
    #[arg(
        short = 's',
        long,
        help = "Since date in ISO8601 format. Example: '2022-08-22T12:00:00.0+02:00'"
    )]
    since: Option<String>,
    #[arg(
        short = 'd',
        long,
        allow_hyphen_values = true,
        help = "Duration in seconds/minutes/hours/days, without '+' and '-'",
        long_help = r#"Duration in seconds/minutes/hours/days.
Can be specified in a simple or ISO8601 format without '+' and '-'.
Simple format examples: '30s', '30m', '1h', '1d'.
ISO8601 format examples: 'pt30s', 'pt30m', 'pt1h', 'p1d'.
If '--since' is provided, the time-window will be from 'since' to 'since+duration'.
If only '--duration' is provided, the time-window will be from 'now-duration' to 'now'."#
    )]
    duration: Option<String>,
    #[arg(
        long,
        help = "Show repair info for local node or cluster wide, default is cluster wide"
    )]
    local: bool,
    #[command(flatten)]
    url: UrlArg,
    #[arg(
        short = 'l',
        long,
        default_value_t = -1,
        allow_negative_numbers = true,
        help = "Limit the number of tables (-1 to disable)"
    )]
    limit: i64,
}

#[derive(Args)]
struct StartArgs {
    #[arg(short = 'f', long, help = "Start in foreground")]
    foreground: bool,
    #[arg(
        short = 'p',
        long,
        help = "Pidfile where to store the pid, default $ECCHRONOS_HOME/ecc.pid",
        value_hint = ValueHint::FilePath
    )]
    pidfile: Option<PathBuf>,
}

#[derive(Args)]
struct StopArgs {
    #[arg(
        short = 'p',
        long,
        help = "Pidfile where to retrieve the pid, default $ECCHRONOS_HOME/ecc.pid",
        value_hint = ValueHint::FilePath
    )]
    pidfile: Option<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    #[command(flatten)]
    url: UrlArg,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, run};
    use clap::{CommandFactory, Parser};
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("parse")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn limit_accepts_negative_values() {
        let cli = parse(&["ecctool", "repairs", "-l", "-1"]);
        match cli.command {
            Command::Repairs(args) => assert_eq!(args.limit, -1),
            _ => panic!("expected repairs"),
        }
        let cli = parse(&["ecctool", "schedules"]);
        match cli.command {
            Command::Schedules(args) => assert_eq!(args.limit, -1),
            _ => panic!("expected schedules"),
        }
    }

    #[test]
    fn signed_duration_reaches_validation() {
        let cli = parse(&["ecctool", "repair-info", "-d", "-30m"]);
        match cli.command {
            Command::RepairInfo(args) => assert_eq!(args.duration.as_deref(), Some("-30m")),
            _ => panic!("expected repair-info"),
        }
    }

    #[test]
    fn hostid_flag_is_spelled_like_the_service() {
        let cli = parse(&["ecctool", "repairs", "--hostid", "abc"]);
        match cli.command {
            Command::Repairs(args) => assert_eq!(args.host_id.as_deref(), Some("abc")),
            _ => panic!("expected repairs"),
        }
    }

    #[test]
    fn unknown_flag_is_a_usage_exit() {
        let args = ["ecctool", "status", "--bogus"].map(OsString::from);
        let outcome = run(args).expect("outcome");
        assert_eq!(outcome.exit_code, 2);
    }
}
