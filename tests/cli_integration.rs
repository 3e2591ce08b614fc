// CLI integration tests for account and post flows.
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_chirp");
    Command::new(exe)
}

fn run(data_dir: &Path, args: &[&str]) -> Output {
    cmd()
        .arg("--dir")
        .arg(data_dir)
        .args(args)
        .output()
        .expect("run chirp")
}

fn parse_json(output: &[u8]) -> Value {
    let text = std::str::from_utf8(output).expect("utf8");
    serde_json::from_str(text.trim()).expect("valid json")
}

fn signup(data_dir: &Path, email: &str, password: &str) -> Value {
    let output = run(
        data_dir,
        &[
            "signup",
            "--email",
            email,
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--birth-date",
            "1815-12-10",
            "--password",
            password,
        ],
    );
    assert!(output.status.success(), "signup failed: {output:?}");
    parse_json(&output.stdout)
}

#[test]
fn init_creates_empty_collections() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");

    let init = run(&data_dir, &["init"]);
    assert!(init.status.success());
    let json = parse_json(&init.stdout);
    assert_eq!(json["collections"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        std::fs::read_to_string(data_dir.join("users.json")).expect("users"),
        "[]"
    );
    assert_eq!(
        std::fs::read_to_string(data_dir.join("tweets.json")).expect("tweets"),
        "[]"
    );
}

#[test]
fn commands_before_init_report_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = run(&temp.path().join("data"), &["users", "list"]);
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "NotFound");
    assert!(err["error"]["hint"].as_str().unwrap_or_default().contains("chirp init"));
}

#[test]
fn signup_login_and_account_lifecycle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    assert!(run(&data_dir, &["init"]).status.success());

    let profile = signup(&data_dir, "ada@example.com", "secret12");
    assert!(profile.get("password").is_none());
    let user_id = profile["user_id"].as_str().expect("user_id").to_string();

    let login = run(
        &data_dir,
        &["login", "--email", "ada@example.com", "--password", "secret12"],
    );
    assert!(login.status.success());
    let login_json = parse_json(&login.stdout);
    assert_eq!(login_json["status"], "authenticated");
    assert_eq!(login_json["account"]["user_id"], user_id.as_str());

    let wrong = run(
        &data_dir,
        &["login", "--email", "ada@example.com", "--password", "secret99"],
    );
    assert_eq!(wrong.status.code(), Some(9));
    assert_eq!(parse_json(&wrong.stderr)["error"]["kind"], "WrongPassword");

    let missing = run(
        &data_dir,
        &["login", "--email", "bob@example.com", "--password", "secret12"],
    );
    assert_eq!(missing.status.code(), Some(3));
    assert_eq!(parse_json(&missing.stderr)["error"]["kind"], "NotFound");

    let update = run(
        &data_dir,
        &[
            "users",
            "update",
            &user_id,
            "--first-name",
            "Augusta",
            "--last-name",
            "King",
            "--email",
            "augusta@example.com",
        ],
    );
    assert!(update.status.success());
    assert_eq!(parse_json(&update.stdout)["first_name"], "Augusta");

    let get = run(&data_dir, &["users", "get", &user_id]);
    assert_eq!(parse_json(&get.stdout)["email"], "augusta@example.com");

    let delete = run(&data_dir, &["users", "delete", &user_id]);
    assert!(delete.status.success());
    let list = run(&data_dir, &["users", "list"]);
    assert_eq!(parse_json(&list.stdout), Value::Array(Vec::new()));
}

#[test]
fn duplicate_email_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    assert!(run(&data_dir, &["init"]).status.success());
    signup(&data_dir, "ada@example.com", "secret12");

    let again = run(
        &data_dir,
        &[
            "signup",
            "--email",
            "ada@example.com",
            "--first-name",
            "Ada",
            "--last-name",
            "Again",
            "--password",
            "secret12",
        ],
    );
    assert_eq!(again.status.code(), Some(4));
    assert_eq!(parse_json(&again.stderr)["error"]["kind"], "Duplicate");
}

#[test]
fn invalid_fields_are_usage_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    assert!(run(&data_dir, &["init"]).status.success());

    let output = run(
        &data_dir,
        &[
            "signup",
            "--email",
            "not-an-email",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--password",
            "short",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    let message = parse_json(&output.stderr)["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(message.contains("email"));
    assert!(message.contains("password"));
}

#[test]
fn post_lifecycle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    assert!(run(&data_dir, &["init"]).status.success());
    let profile = signup(&data_dir, "ada@example.com", "secret12");
    let user_id = profile["user_id"].as_str().expect("user_id").to_string();

    let publish = run(
        &data_dir,
        &["posts", "publish", "--author", &user_id, "--content", "first post"],
    );
    assert!(publish.status.success());
    let post = parse_json(&publish.stdout);
    let tweet_id = post["tweet_id"].as_str().expect("tweet_id").to_string();
    assert_eq!(post["by"]["user_id"], user_id.as_str());
    assert!(post["updated_at"].is_null());

    let edit = run(
        &data_dir,
        &["posts", "edit", &tweet_id, "--content", "edited post"],
    );
    assert!(edit.status.success());
    let edited = parse_json(&edit.stdout);
    assert_eq!(edited["content"], "edited post");
    assert_eq!(edited["created_at"], post["created_at"]);
    assert!(edited["updated_at"].is_string());

    let list = run(&data_dir, &["posts", "list"]);
    assert_eq!(parse_json(&list.stdout).as_array().map(Vec::len), Some(1));

    let delete = run(&data_dir, &["posts", "delete", &tweet_id]);
    assert!(delete.status.success());
    let get = run(&data_dir, &["posts", "get", &tweet_id]);
    assert_eq!(get.status.code(), Some(3));
}

#[test]
fn doctor_flags_corrupt_collection() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    assert!(run(&data_dir, &["init"]).status.success());

    let healthy = run(&data_dir, &["doctor"]);
    assert!(healthy.status.success());

    std::fs::write(data_dir.join("users.json"), "[{\"user_id\":").expect("write");
    let doctor = run(&data_dir, &["doctor"]);
    assert_eq!(doctor.status.code(), Some(7));
    let reports = parse_json(&doctor.stdout);
    assert_eq!(reports["reports"][0]["kind"], "accounts");
    assert_eq!(reports["reports"][0]["ok"], false);
    assert_eq!(reports["reports"][1]["ok"], true);

    let list = run(&data_dir, &["users", "list"]);
    assert_eq!(list.status.code(), Some(7));
}
