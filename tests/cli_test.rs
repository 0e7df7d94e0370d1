mod common;

use assert_cmd::prelude::*;
use common::Workspace;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;

#[test]
fn test_ping() {
    let ws = Workspace::new();
    let (status, body) = ws.call("GET", "ping", None, &[], None);
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));

    let (status, _) = ws.call("GET", "nowhere", None, &[], None);
    assert_eq!(status, 404);
}

#[test]
fn test_order_is_paid_by_settlement() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new();
    let token = ws.sign_up("jane@example.com");
    let id = ws.create_order(&token, &[1, 1]);
    assert_eq!(ws.pay(&token, &id), 200);

    ws.cmd()
        .arg("settle")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id} successful-payment")));

    let (status, order) = ws.call("GET", "orders", Some(&token), &[("id", &id)], None);
    assert_eq!(status, 200);
    assert_eq!(order["state"], "paid");
    assert!(order["timePaid"].is_i64());

    // nothing left to settle
    ws.cmd()
        .arg("settle")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let log = std::fs::read_to_string(ws.dir.path().join("logs").join(format!("{id}.log")))?;
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("\"successful-payment\""));
    Ok(())
}

#[test]
fn test_free_order_is_removed() {
    let ws = Workspace::new();
    let catalog = ws.dir.path().join("menu.csv");
    let mut file = std::fs::File::create(&catalog).unwrap();
    writeln!(file, "id,name,price").unwrap();
    writeln!(file, "1,Water,0.00").unwrap();
    writeln!(file, "2,Pizza,$7.50").unwrap();
    drop(file);

    let with_menu = |args: &[&str]| {
        let mut cmd = ws.cmd();
        cmd.arg("--catalog").arg(&catalog).args(args);
        cmd
    };

    let token = ws.sign_up("jane@example.com");
    let output = with_menu(&["call", "POST", "orders", "--token", &token, "--body", r#"{"order":[1]}"#])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let (_, body) = stdout.split_once('\n').unwrap();
    let order: serde_json::Value = serde_json::from_str(body).unwrap();
    let id = order["id"].as_str().unwrap().to_string();

    with_menu(&["call", "POST", "pay", "--token", &token, "--body", &json!({"id": id}).to_string()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("200"));

    with_menu(&["settle"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id} free-order")));

    let (status, _) = ws.call("GET", "orders", Some(&token), &[("id", &id)], None);
    assert_eq!(status, 404);
    let (_, account) = ws.call("GET", "users", Some(&token), &[("email", "jane@example.com")], None);
    assert_eq!(account["orders"], json!([]));
}

#[test]
fn test_other_users_order_is_forbidden_not_missing() {
    let ws = Workspace::new();
    let jane = ws.sign_up("jane@example.com");
    let john = ws.sign_up("john@example.com");
    let id = ws.create_order(&jane, &[2]);

    let (status, _) = ws.call("GET", "orders", Some(&john), &[("id", &id)], None);
    assert_eq!(status, 403);

    let (status, _) = ws.call("GET", "orders", Some(&john), &[("id", "zzzzzzzzzzzzzzzzzzzz")], None);
    assert_eq!(status, 404);

    assert_eq!(ws.pay(&john, &id), 403);
}

#[test]
fn test_submit_guards() {
    let ws = Workspace::new();
    let token = ws.sign_up("jane@example.com");
    let id = ws.create_order(&token, &[3]);

    assert_eq!(ws.pay(&token, &id), 200);
    assert_eq!(ws.pay(&token, &id), 409);

    let (status, _) = ws.call(
        "PUT",
        "orders",
        Some(&token),
        &[],
        Some(json!({"id": id, "order": [4]})),
    );
    assert_eq!(status, 409);

    let (status, body) = ws.call("POST", "orders", Some(&token), &[], Some(json!({"order": []})));
    assert_eq!(status, 400);
    assert!(body["Error"].is_string());
}

#[test]
fn test_delete_account_removes_orders() {
    let ws = Workspace::new();
    let token = ws.sign_up("jane@example.com");
    let first = ws.create_order(&token, &[1]);
    let second = ws.create_order(&token, &[2]);

    let (status, _) = ws.call("DELETE", "users", Some(&token), &[("email", "jane@example.com")], None);
    assert_eq!(status, 200);

    let orders = ws.dir.path().join("records").join("orders");
    assert!(!orders.join(format!("{first}.json")).exists());
    assert!(!orders.join(format!("{second}.json")).exists());
    assert!(!ws.dir.path().join("records/users/jane@example.com.json").exists());
}

#[test]
fn test_rotate_logs() {
    let ws = Workspace::new();
    let token = ws.sign_up("jane@example.com");
    let id = ws.create_order(&token, &[5]);
    ws.pay(&token, &id);
    ws.cmd().arg("settle").assert().success();

    ws.cmd()
        .arg("rotate-logs")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id} -> {id}-")));

    let logs = ws.dir.path().join("logs");
    let active = std::fs::read_to_string(logs.join(format!("{id}.log"))).unwrap();
    assert!(active.is_empty());
    let archives = std::fs::read_dir(&logs)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "zip"))
        .count();
    assert_eq!(archives, 1);

    // empty logs are left alone
    ws.cmd()
        .arg("rotate-logs")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_invalid_call_arguments() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["call", "FETCH", "ping"])
        .assert()
        .failure();
    ws.cmd()
        .args(["call", "GET", "ping", "--query", "novalue"])
        .assert()
        .failure();
    ws.cmd()
        .args(["call", "POST", "users", "--body", "{not json"])
        .assert()
        .failure();
}
