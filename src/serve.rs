//! Purpose: HTTP/JSON server exposing accounts and posts.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum request layer over `api::Store`; maps error kinds to status codes.
//! Invariants: Routes and form field names match the historical service.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Store calls run on the blocking pool; handlers never touch files directly.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chirp::api::{AccountUpdate, AuthOutcome, Error, ErrorKind, NewAccount, NewPost, Store};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
}

struct AppState {
    store: Store,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let store = Store::init(&config.data_dir)?;
    tracing::info!(data_dir = %store.data_dir().display(), "collections ready");
    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/users/:user_id", get(show_user))
        .route("/users/:user_id/delete", delete(delete_user))
        .route("/users/:user_id/update", put(update_user))
        .route("/", get(list_tweets))
        .route("/post", post(post_tweet))
        .route("/tweet/:tweet_id", get(show_tweet))
        .route("/tweet/:tweet_id/delete", delete(delete_tweet))
        .route("/tweet/:tweet_id/update", put(update_tweet))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    tracing::info!("server stopped");
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 65536."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn run_blocking<T, F>(state: &Arc<AppState>, op: F) -> Result<T, Error>
where
    F: FnOnce(&Store) -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || op(&state.store))
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("store task failed")
                .with_source(err)
        })?
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    login_email: String,
    login_password: String,
}

#[derive(Debug, Deserialize)]
struct ContentForm {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PostRequest {
    #[serde(default)]
    tweet_id: Option<String>,
    content: String,
    #[serde(default)]
    created_at: Option<String>,
    by: AuthorRef,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

async fn healthz() -> Response {
    json_response(StatusCode::OK, &json!({ "ok": true }))
}

async fn signup(State(state): State<Arc<AppState>>, Json(payload): Json<NewAccount>) -> Response {
    let result = run_blocking(&state, move |store| store.signup(payload)).await;
    respond(StatusCode::CREATED, result)
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    let result = run_blocking(&state, move |store| {
        store
            .login(&form.login_email, &form.login_password)
            .and_then(AuthOutcome::into_profile)
    })
    .await;
    respond(StatusCode::OK, result)
}

async fn list_users(State(state): State<Arc<AppState>>) -> Response {
    let result = run_blocking(&state, |store| store.accounts()).await;
    respond(StatusCode::OK, result)
}

async fn show_user(
    State(state): State<Arc<AppState>>,
    AxumPath(user_id): AxumPath<String>,
) -> Response {
    let result = run_blocking(&state, move |store| store.account(&user_id)).await;
    respond(StatusCode::OK, result)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AxumPath(user_id): AxumPath<String>,
) -> Response {
    let result = run_blocking(&state, move |store| store.delete_account(&user_id)).await;
    respond(StatusCode::OK, result)
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    AxumPath(user_id): AxumPath<String>,
    Form(update): Form<AccountUpdate>,
) -> Response {
    let result = run_blocking(&state, move |store| store.update_account(&user_id, update)).await;
    respond(StatusCode::OK, result)
}

async fn list_tweets(State(state): State<Arc<AppState>>) -> Response {
    let result = run_blocking(&state, |store| store.posts()).await;
    respond(StatusCode::OK, result)
}

async fn post_tweet(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PostRequest>,
) -> Response {
    let request = NewPost {
        tweet_id: payload.tweet_id,
        content: payload.content,
        created_at: payload.created_at,
        author_id: payload.by.user_id,
    };
    let result = run_blocking(&state, move |store| store.publish(request)).await;
    respond(StatusCode::CREATED, result)
}

async fn show_tweet(
    State(state): State<Arc<AppState>>,
    AxumPath(tweet_id): AxumPath<String>,
) -> Response {
    let result = run_blocking(&state, move |store| store.post(&tweet_id)).await;
    respond(StatusCode::OK, result)
}

async fn delete_tweet(
    State(state): State<Arc<AppState>>,
    AxumPath(tweet_id): AxumPath<String>,
) -> Response {
    let result = run_blocking(&state, move |store| store.delete_post(&tweet_id)).await;
    respond(StatusCode::OK, result)
}

async fn update_tweet(
    State(state): State<Arc<AppState>>,
    AxumPath(tweet_id): AxumPath<String>,
    Form(form): Form<ContentForm>,
) -> Response {
    let result = run_blocking(&state, move |store| store.edit_post(&tweet_id, form.content)).await;
    respond(StatusCode::OK, result)
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, Error>) -> Response {
    match result {
        Ok(value) => json_response(status, &value),
        Err(err) => error_response(err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    (status, Json(payload)).into_response()
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Usage => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound | ErrorKind::WrongPassword => StatusCode::NOT_FOUND,
        ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::Busy => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Permission | ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(err.kind());
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}
