// Multi-process lock smoke test for collection write serialization.
use std::process::{Command, Stdio};

use chirp::api::Store;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_chirp");
    Command::new(exe)
}

#[test]
fn concurrent_signups_are_serialized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");

    let init = cmd()
        .args(["--dir", data_dir.to_str().unwrap(), "init"])
        .output()
        .expect("init");
    assert!(init.status.success());

    let workers = 8;
    let mut children = Vec::new();
    for i in 0..workers {
        let child = cmd()
            .args([
                "--dir",
                data_dir.to_str().unwrap(),
                "signup",
                "--email",
                &format!("user{i}@example.com"),
                "--first-name",
                "Lock",
                "--last-name",
                &format!("Worker{i}"),
                "--password",
                "secret12",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        children.push(child);
    }

    for mut child in children {
        let status = child.wait().expect("wait");
        assert!(status.success());
    }

    let store = Store::open(&data_dir).expect("open");
    let accounts = store.accounts().expect("accounts");
    assert_eq!(accounts.len(), workers);
    let mut ids: Vec<_> = accounts.iter().map(|account| account.user_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), workers);
}
