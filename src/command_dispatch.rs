//! Purpose: Hold top-level CLI command dispatch for `chirp`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command opens the store once and drops it before returning.
//! Invariants: Login failures exit with distinct codes for wrong password and unknown email.

use super::*;
use chirp::api::{AccountUpdate, AuthOutcome, NewAccount, NewPost};

pub(super) fn dispatch_command(
    command: Command,
    data_dir: PathBuf,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "chirp", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Init => {
            let store = Store::init(&data_dir)?;
            emit_json(json!({
                "data_dir": store.data_dir().display().to_string(),
                "collections": [
                    store.account_collection().path().display().to_string(),
                    store.post_collection().path().display().to_string(),
                ],
            }));
            Ok(RunOutcome::ok())
        }
        Command::Doctor => {
            let reports = Store::doctor(&data_dir);
            let healthy = reports.iter().all(|report| report.ok);
            emit_json(json!({ "reports": to_json(&reports)? }));
            if healthy {
                Ok(RunOutcome::ok())
            } else {
                Ok(RunOutcome::with_code(to_exit_code(ErrorKind::Corrupt)))
            }
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            max_body_bytes,
        } => {
            let config = serve::ServeConfig {
                bind: parse_bind(&bind)?,
                data_dir,
                allow_non_loopback,
                max_body_bytes,
            };
            if io::stderr().is_terminal() {
                let label = colorize_label("serve:", color_mode.use_color(true), AnsiColor::Yellow);
                eprintln!("{label} listening on http://{}", config.bind);
            }
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::Signup {
            id,
            email,
            first_name,
            last_name,
            birth_date,
            password,
        } => {
            let store = Store::open(&data_dir)?;
            let profile = store.signup(NewAccount {
                user_id: id,
                email,
                first_name,
                last_name,
                birth_date,
                password,
            })?;
            emit_json(to_json(&profile)?);
            Ok(RunOutcome::ok())
        }
        Command::Login { email, password } => {
            let store = Store::open(&data_dir)?;
            let profile = store
                .login(&email, &password)
                .and_then(AuthOutcome::into_profile)?;
            emit_json(json!({ "status": "authenticated", "account": to_json(&profile)? }));
            Ok(RunOutcome::ok())
        }
        Command::Users { command } => {
            let store = Store::open(&data_dir)?;
            let value = match command {
                UsersCommand::List => to_json(&store.accounts()?)?,
                UsersCommand::Get { id } => to_json(&store.account(&id)?)?,
                UsersCommand::Update {
                    id,
                    first_name,
                    last_name,
                    email,
                } => to_json(&store.update_account(
                    &id,
                    AccountUpdate {
                        first_name,
                        last_name,
                        email,
                    },
                )?)?,
                UsersCommand::Delete { id } => to_json(&store.delete_account(&id)?)?,
            };
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Posts { command } => {
            let store = Store::open(&data_dir)?;
            let value = match command {
                PostsCommand::List => to_json(&store.posts()?)?,
                PostsCommand::Get { id } => to_json(&store.post(&id)?)?,
                PostsCommand::Publish {
                    id,
                    author,
                    content,
                } => to_json(&store.publish(NewPost {
                    tweet_id: id,
                    content,
                    created_at: None,
                    author_id: author,
                })?)?,
                PostsCommand::Edit { id, content } => to_json(&store.edit_post(&id, content)?)?,
                PostsCommand::Delete { id } => to_json(&store.delete_post(&id)?)?,
            };
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}
