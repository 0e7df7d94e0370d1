#![allow(dead_code)]

use assert_cmd::cargo_bin;
use serde_json::{Value, json};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway data directory plus helpers for driving the binary against it.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(cargo_bin!("orderpay"));
        cmd.arg("--data-dir").arg(self.dir.path());
        for key in [
            "ORDERPAY_ENV",
            "ORDERPAY_CATALOG",
            "ORDERPAY_HASHING_SECRET",
            "STRIPE_SECRET_KEY",
            "MAILGUN_API_KEY",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }

    /// Runs `call` and returns the status and parsed JSON body.
    pub fn call(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut cmd = self.cmd();
        cmd.arg("call").arg(method).arg(path);
        if let Some(token) = token {
            cmd.arg("--token").arg(token);
        }
        for (key, value) in query {
            cmd.arg("--query").arg(format!("{key}={value}"));
        }
        if let Some(body) = body {
            cmd.arg("--body").arg(body.to_string());
        }

        let output = cmd.output().expect("Failed to execute command");
        assert!(
            output.status.success(),
            "call failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        let (status, body) = stdout.split_once('\n').expect("status line");
        (status.trim().parse().unwrap(), serde_json::from_str(body).unwrap())
    }

    /// Creates an account and returns a fresh token for it.
    pub fn sign_up(&self, email: &str) -> String {
        let (status, _) = self.call(
            "POST",
            "users",
            None,
            &[],
            Some(json!({
                "email": email,
                "firstName": "Jane",
                "lastName": "Doe",
                "streetAddress": "1 Main St",
                "password": "hunter2",
                "tosAgreement": true
            })),
        );
        assert_eq!(status, 200);

        let (status, token) = self.call(
            "POST",
            "tokens",
            None,
            &[],
            Some(json!({"email": email, "password": "hunter2"})),
        );
        assert_eq!(status, 200);
        token["id"].as_str().unwrap().to_string()
    }

    pub fn create_order(&self, token: &str, items: &[u32]) -> String {
        let (status, order) = self.call("POST", "orders", Some(token), &[], Some(json!({"order": items})));
        assert_eq!(status, 200, "{order}");
        order["id"].as_str().unwrap().to_string()
    }

    pub fn pay(&self, token: &str, id: &str) -> u16 {
        self.call("POST", "pay", Some(token), &[], Some(json!({"id": id}))).0
    }
}
