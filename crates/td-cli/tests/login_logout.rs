//! Login, registration and logout against a mock task service.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn auth_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "user": {"id": 1, "email": "a@b.com"},
        "token": "tok1"
    }))
}

#[tokio::test]
async fn test_login_persists_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "x"})))
        .respond_with(auth_ok())
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("td")
        .env("TD_HOME", home.path())
        .env("TD_API_URL", format!("{}/api", server.uri()))
        .args(["login", "--email", "a@b.com", "--password", "x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as a@b.com"));

    let stored = fs::read_to_string(home.path().join("session.json")).unwrap();
    assert!(stored.contains("tok1"));
}

#[tokio::test]
async fn test_register_reads_password_from_stdin() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({"email": "a@b.com", "password": "s3cret"})))
        .respond_with(auth_ok())
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("td")
        .env("TD_HOME", home.path())
        .env("TD_API_URL", format!("{}/api", server.uri()))
        .args(["register", "--email", "a@b.com"])
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered and logged in"));

    assert!(home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_rejected_login_shows_server_message_and_saves_nothing() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("td")
        .env("TD_HOME", home.path())
        .env("TD_API_URL", format!("{}/api", server.uri()))
        .args(["login", "--email", "a@b.com", "--password", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Login failed"))
        .stderr(predicate::str::contains("Invalid credentials"));

    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_logout_removes_saved_session() {
    let home = TempDir::new().unwrap();
    let session = home.path().join("session.json");
    fs::write(&session, r#"{"token":"tok1"}"#).unwrap();

    cargo_bin_cmd!("td")
        .env("TD_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(!session.exists());
}
