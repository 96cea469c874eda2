//! Task commands against a mock task service.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// A TD_HOME with a saved session token.
fn signed_in_home() -> TempDir {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("session.json"), r#"{"token":"tok1"}"#).unwrap();
    home
}

fn td(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("td");
    cmd.env("TD_HOME", home)
        .env("TD_API_URL", format!("{}/api", server.uri()));
    cmd
}

#[test]
fn test_tasks_require_login() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("td")
        .env("TD_HOME", home.path())
        .args(["tasks", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("log in first"));
}

#[tokio::test]
async fn test_list_prints_json() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Write report", "effort": 3, "dueDate": "2026-05-01", "status": "in_progress"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let output = td(home.path(), &server)
        .args(["tasks", "list", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let tasks: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tasks[0]["title"], "Write report");
    assert_eq!(tasks[0]["status"], "in_progress");
    assert_eq!(tasks[0]["dueDate"], "2026-05-01");
}

#[tokio::test]
async fn test_list_table_and_empty_list() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[tokio::test]
async fn test_add_sends_draft_with_defaults() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({
            "title": "T",
            "description": "",
            "effort": null,
            "dueDate": null,
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5, "title": "T", "description": "", "effort": null, "dueDate": null, "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "add", "--title", "T"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task 5: T"));
}

#[tokio::test]
async fn test_update_sends_full_task_with_changed_status() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "title": "Keep", "description": "notes", "effort": 2, "dueDate": null, "status": "pending"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/7"))
        .and(body_json(json!({
            "title": "Keep",
            "description": "notes",
            "effort": 2.0,
            "dueDate": null,
            "status": "completed"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "title": "Keep", "description": "notes", "effort": 2, "status": "completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "update", "7", "--status", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated task 7"));
}

#[tokio::test]
async fn test_delete_failure_reports_store_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/9"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "delete", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to delete task"));
}

#[tokio::test]
async fn test_unauthorized_expires_saved_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session expired"));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_export_saves_into_requested_dir() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let out = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/export"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK-xlsx".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "export", "--dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("tasks.xlsx"));

    assert_eq!(fs::read(out.path().join("tasks.xlsx")).unwrap(), b"PK-xlsx");
}

#[tokio::test]
async fn test_import_uploads_then_refreshes() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let sheet = home.path().join("tasks.xlsx");
    fs::write(&sheet, b"sheet-bytes").unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/import"))
        .respond_with(|req: &Request| {
            let body = String::from_utf8_lossy(&req.body).to_string();
            if body.contains(r#"name="file""#) && body.contains("sheet-bytes") {
                ResponseTemplate::new(200).set_body_json(json!({"imported": 2}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "a", "status": "pending"},
            {"id": 2, "title": "b", "status": "pending"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    td(home.path(), &server)
        .args(["tasks", "import"])
        .arg(&sheet)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 tasks now"));
}
