//! Purpose: `chirp` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Successful commands print exactly one JSON value on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All collection access goes through `api::Store`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;

mod command_dispatch;
mod serve;

use chirp::api::{Error, ErrorKind, Store, to_exit_code};

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
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `chirp --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let data_dir = cli.dir.unwrap_or_else(Store::default_data_dir);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, data_dir, color_mode)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "chirp",
    version,
    about = "Accounts and short posts stored in flat JSON files",
    long_about = None,
    after_help = r#"EXAMPLES
  $ chirp init
  $ chirp signup --email ada@example.com --first-name Ada --last-name Lovelace --password secret12
  $ chirp login --email ada@example.com --password secret12
  $ chirp posts publish --author <USER_ID> --content "hello"
  $ chirp serve --bind 127.0.0.1:8000

NOTES
  - Default data directory: ~/.chirp/data (override with --dir)
  - Collections: users.json and tweets.json, each a JSON array"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Data directory holding users.json and tweets.json (default: ~/.chirp/data)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Create the data directory and empty collections")]
    Init,
    #[command(about = "Register an account")]
    Signup {
        #[arg(long, help = "Account id (UUID); generated when omitted")]
        id: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long = "first-name")]
        first_name: String,
        #[arg(long = "last-name")]
        last_name: String,
        #[arg(long = "birth-date", help = "Birth date as YYYY-MM-DD")]
        birth_date: Option<String>,
        #[arg(long)]
        password: String,
    },
    #[command(about = "Check an email/password pair")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    #[command(arg_required_else_help = true, about = "Inspect and edit accounts")]
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    #[command(arg_required_else_help = true, about = "Inspect and edit posts")]
    Posts {
        #[command(subcommand)]
        command: PostsCommand,
    },
    #[command(about = "Check that both collection files parse")]
    Doctor,
    #[command(about = "Serve the HTTP API")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000", help = "Bind address")]
        bind: String,
        #[arg(long, help = "Allow binding to a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(long, default_value_t = 64 * 1024, help = "Maximum request body size")]
        max_body_bytes: u64,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    #[command(about = "List all accounts")]
    List,
    #[command(about = "Show one account")]
    Get { id: String },
    #[command(about = "Replace first name, last name, and email")]
    Update {
        id: String,
        #[arg(long = "first-name")]
        first_name: String,
        #[arg(long = "last-name")]
        last_name: String,
        #[arg(long)]
        email: String,
    },
    #[command(about = "Delete an account")]
    Delete { id: String },
}

#[derive(Subcommand)]
enum PostsCommand {
    #[command(about = "List all posts")]
    List,
    #[command(about = "Show one post")]
    Get { id: String },
    #[command(about = "Publish a post as an existing account")]
    Publish {
        #[arg(long, help = "Post id (UUID); generated when omitted")]
        id: Option<String>,
        #[arg(long, help = "Author account id")]
        author: String,
        #[arg(long)]
        content: String,
    },
    #[command(about = "Replace a post's content")]
    Edit {
        id: String,
        #[arg(long)]
        content: String,
    },
    #[command(about = "Delete a post")]
    Delete { id: String },
}

fn parse_bind(bind: &str) -> Result<SocketAddr, Error> {
    bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:8000.")
    })
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Duplicate => "already exists".to_string(),
        ErrorKind::Busy => "collection is busy".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt collection".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::WrongPassword => "wrong password".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, error_text, parse_bind};
    use chirp::api::{Error, ErrorKind};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_json_carries_kind_and_hint() {
        let err = Error::new(ErrorKind::WrongPassword)
            .with_message("the password is incorrect")
            .with_hint("check the password");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "WrongPassword");
        assert_eq!(value["error"]["message"], "the password is incorrect");
        assert_eq!(value["error"]["hint"], "check the password");
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::NotFound).with_message("missing");
        assert!(!error_text(&err, false).contains('\u{1b}'));
        assert!(error_text(&err, true).contains('\u{1b}'));
    }

    #[test]
    fn bind_must_be_socket_addr() {
        assert!(parse_bind("127.0.0.1:8000").is_ok());
        let err = parse_bind("localhost").expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
