//! End-to-end tests of the HTTP API with a scripted command executor and the
//! simulated GPIO backend.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use guardian_rpi::{
    create_app, AgentConfig, AppState, CommandExecutor, CommandResult, FailureReason, GpioTiming,
    SimulatedBackend,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "test-token-123";

/// Answers commands from a table; anything else is "not found".
#[derive(Default)]
struct ScriptedExecutor {
    answers: HashMap<String, CommandResult>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn ok(mut self, command: &str, output: &str) -> Self {
        self.answers
            .insert(command.to_string(), CommandResult::Success(output.to_string()));
        self
    }

    fn fail(mut self, command: &str) -> Self {
        self.answers.insert(
            command.to_string(),
            CommandResult::Failure(FailureReason::NonZeroExit(Some(1))),
        );
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, argv: &[&str], _timeout: Duration) -> CommandResult {
        let line = argv.join(" ");
        self.calls.lock().unwrap().push(line.clone());
        self.answers
            .get(&line)
            .cloned()
            .unwrap_or(CommandResult::Failure(FailureReason::NotFound))
    }
}

struct TestAgent {
    app: Router,
    executor: Arc<ScriptedExecutor>,
    gpio: SimulatedBackend,
    dir: TempDir,
}

impl TestAgent {
    fn new(executor: ScriptedExecutor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("data/readme.txt"), "hello").unwrap();

        let config = AgentConfig::new(TOKEN)
            .unwrap()
            .with_files_root(&root)
            .with_lock_path(dir.path().join("gpio.lock"))
            .with_logs_dir(dir.path().join("logs"))
            .with_gpio_timing(GpioTiming::immediate())
            .with_reboot_grace(Duration::ZERO);

        let executor = Arc::new(executor);
        let gpio = SimulatedBackend::new();
        let state = AppState::new(config, executor.clone(), Arc::new(gpio.clone())).unwrap();

        Self {
            app: create_app(state),
            executor,
            gpio,
            dir,
        }
    }

    fn lock_path(&self) -> std::path::PathBuf {
        self.dir.path().join("gpio.lock")
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            request = request.header(AUTHORIZATION, auth);
        }
        let body = match body {
            Some(json) => {
                request = request.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&bearer()), None).await
    }

    async fn post(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&bearer()), body).await
    }
}

fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

#[tokio::test]
async fn test_health_and_version_are_public() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let (status, body) = agent.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, body) = agent.send(Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "version": env!("CARGO_PKG_VERSION") }));
}

#[tokio::test]
async fn test_protected_routes_reject_bad_credentials() {
    let agent = TestAgent::new(ScriptedExecutor::default().ok("uname -r", "6.6.31"));

    let wrong = format!("Bearer {}x", TOKEN);
    let basic = format!("Basic {}", TOKEN);
    let extra = format!("Bearer {} extra", TOKEN);
    let cases: Vec<Option<&str>> = vec![
        None,
        Some(""),
        Some("Bearer"),
        Some("Bearer "),
        Some(wrong.as_str()),
        Some(basic.as_str()),
        Some(extra.as_str()),
        Some(TOKEN),
    ];
    for auth in cases {
        let (status, body) = agent.send(Method::GET, "/system/kernel", auth, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "auth header {:?}", auth);
        assert_eq!(body, json!({ "error": "forbidden" }));
    }

    // Rejected requests never reach a handler.
    assert!(agent.executor.calls().is_empty());

    let relaxed = format!("bEaReR    {}", TOKEN);
    let (status, body) = agent
        .send(Method::GET, "/system/kernel", Some(&relaxed), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "kernel": "6.6.31" }));
}

#[tokio::test]
async fn test_gpio_on_releases_lock() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let (status, body) = agent
        .post("/gpiocontrol/on", Some(json!({ "pins": [11, 13] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "ok", "action": "on", "pins": [11, 13] })
    );
    assert!(!agent.lock_path().exists());
    // The session reset its pins on the way out.
    assert!(agent.gpio.levels().is_empty());
}

#[tokio::test]
async fn test_gpio_busy_leaves_existing_lock_untouched() {
    let agent = TestAgent::new(ScriptedExecutor::default());
    fs::write(agent.lock_path(), "pid=1 acquired=earlier\n").unwrap();

    let (status, body) = agent
        .post("/gpiocontrol/on", Some(json!({ "pins": [11, 13] })))
        .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["error"].as_str().unwrap().contains("busy"));
    assert_eq!(body["pins"], json!([11, 13]));
    assert_eq!(
        fs::read_to_string(agent.lock_path()).unwrap(),
        "pid=1 acquired=earlier\n"
    );
}

#[tokio::test]
async fn test_gpio_request_validation() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let bad_requests = vec![
        ("/gpiocontrol/test", Some(json!({ "pins": [11, 13] }))),
        ("/gpiocontrol/test", Some(json!({ "pins": [] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [41] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [0] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [6] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [1] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [-1] }))),
        ("/gpiocontrol/on", Some(json!({ "pins": [7, 7] }))),
        ("/gpiocontrol/on", Some(json!({ "pin": 7 }))),
        ("/gpiocontrol/on", None),
        ("/gpiocontrol/blink", Some(json!({ "pins": [7] }))),
    ];
    for (uri, body) in bad_requests {
        let (status, response) = agent.post(uri, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?}", uri, body);
        assert!(response["error"].is_string());
    }
    assert!(!agent.lock_path().exists());
}

#[tokio::test]
async fn test_gpio_test_and_reboot_single_pin() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    for action in ["test", "reboot", "off"] {
        let (status, body) = agent
            .post(&format!("/gpiocontrol/{}", action), Some(json!({ "pins": [7] })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", action);
        assert_eq!(body["action"], json!(action));
    }
    assert!(!agent.lock_path().exists());
}

#[tokio::test]
async fn test_binary_version_missing_is_not_found() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let (status, body) = agent.get("/binaries/version/nonexistent-binary-xyz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["binary"], json!("nonexistent-binary-xyz"));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_binary_version_and_exists() {
    let agent = TestAgent::new(
        ScriptedExecutor::default()
            .ok("which git", "/usr/bin/git")
            .ok("/usr/bin/git --version", "git version 2.39.5\nextra line"),
    );

    let (status, body) = agent.get("/binaries/version/git").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "binary": "git", "version": "git version 2.39.5" }));

    let (_, body) = agent.get("/binaries/exists/git").await;
    assert_eq!(body, json!({ "binary": "git", "exists": true }));
    let (_, body) = agent.get("/binaries/exists/ffmpeg").await;
    assert_eq!(body, json!({ "binary": "ffmpeg", "exists": false }));

    let (status, _) = agent.get("/binaries/exists/-rf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = agent.get("/binaries/version/git;reboot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_package_install() {
    let agent = TestAgent::new(
        ScriptedExecutor::default()
            .ok("dpkg -s curl", "Package: curl\nStatus: install ok installed")
            .ok("sudo apt-get update", "Reading package lists...")
            .ok(
                "sudo apt-get install -y nmap",
                &(1..=15).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n"),
            ),
    );

    let (status, body) = agent.post("/binaries/install/curl", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "package": "curl", "status": "already installed" }));

    let (status, body) = agent.post("/binaries/install/nmap", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("installed"));
    let output = body["output"].as_array().unwrap();
    assert_eq!(output.len(), 10);
    assert_eq!(output[0], json!("line 6"));
    assert_eq!(output[9], json!("line 15"));

    let (status, body) = agent.post("/binaries/install/htop", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["package"], json!("htop"));
}

#[tokio::test]
async fn test_unauthorized_service_is_not_found() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let (status, body) = agent.get("/services/unauthorized-svc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["service"], json!("unauthorized-svc"));

    let (status, _) = agent.post("/services/unauthorized-svc/restart", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(agent.executor.calls().is_empty());
}

#[tokio::test]
async fn test_service_status_and_actions() {
    let agent = TestAgent::new(
        ScriptedExecutor::default()
            .ok("systemctl show -p ActiveState --value ssh", "active")
            .ok(
                "systemctl list-unit-files ssh.service --no-legend",
                "ssh.service enabled enabled",
            )
            .ok("sudo systemctl restart ssh", "")
            .fail("sudo systemctl stop ssh"),
    );

    let (_, body) = agent.get("/services/authorized").await;
    assert_eq!(body, json!({ "services": ["nodered", "ssh", "vncserver"] }));

    let (status, body) = agent.get("/services/ssh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "service": "ssh", "action": "status", "result": "active" })
    );
    let (_, same) = agent.get("/services/ssh/status").await;
    assert_eq!(same, body);

    let (_, body) = agent.post("/services/ssh/restart", None).await;
    assert_eq!(body["result"], json!("ok"));
    let (_, body) = agent.post("/services/ssh/stop", None).await;
    assert_eq!(body["result"], json!("error"));

    // Allowed name, but the unit is not installed.
    let (status, _) = agent.post("/services/nodered/start", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = agent.post("/services/ssh/reload", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = agent.get("/services/ssh/restart").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_files_are_confined_to_root() {
    let agent = TestAgent::new(ScriptedExecutor::default());

    let (status, body) = agent.get("/files/directory/data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "exists": true }));

    let (_, body) = agent.get("/files/file/data/readme.txt").await;
    assert_eq!(body, json!({ "exists": true }));
    let (_, body) = agent.get("/files/file/data").await;
    assert_eq!(body, json!({ "exists": false }));
    let (_, body) = agent.get("/files/directory/data/missing").await;
    assert_eq!(body, json!({ "exists": false }));

    let (status, _) = agent.get("/files/directory/data/../../outside").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = agent.get("/files/file/data/%01bad").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[cfg(unix)]
#[tokio::test]
async fn test_files_symlink_out_of_root_is_refused() {
    let agent = TestAgent::new(ScriptedExecutor::default());
    let outside = agent.dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("secret"), "x").unwrap();
    std::os::unix::fs::symlink(&outside, agent.dir.path().join("root/link")).unwrap();

    for uri in [
        "/files/file/link/secret",
        "/files/file/nope/../link/secret",
        "/files/directory/nope/deeper/../../link",
    ] {
        let (status, body) = agent.get(uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert!(body.get("exists").is_none(), "{}", uri);
    }
}

#[tokio::test]
async fn test_reboot_falls_back_through_commands() {
    let agent = TestAgent::new(
        ScriptedExecutor::default()
            .fail("sudo shutdown -r now")
            .ok("sudo reboot", ""),
    );
    let (status, body) = agent.post("/power/reboot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "rebooting", "command": "sudo reboot" }));
    assert_eq!(
        agent.executor.calls(),
        vec!["sudo shutdown -r now".to_string(), "sudo reboot".to_string()]
    );
}

#[tokio::test]
async fn test_reboot_fails_when_every_command_fails() {
    let agent = TestAgent::new(ScriptedExecutor::default());
    let (status, body) = agent.post("/power/reboot", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert_eq!(agent.executor.calls().len(), 4);
}

#[tokio::test]
async fn test_getters() {
    let agent = TestAgent::new(
        ScriptedExecutor::default()
            .ok(
                "df -h /",
                "Filesystem Size Used Avail Use% Mounted on\n/dev/root 29G 6.1G 22G 22% /",
            )
            .ok("uname -r", "6.6.31+rpt-rpi-v8")
            .ok("uptime -p", "up 3 days, 2 hours"),
    );

    let (status, body) = agent.get("/storage/total").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total": "29G" }));

    let (_, body) = agent.get("/storage/get_all").await;
    assert_eq!(body, json!({ "total": "29G", "used": "6.1G", "free": "22G" }));

    let (_, body) = agent.get("/system/getall").await;
    assert_eq!(body["kernel"], json!("6.6.31+rpt-rpi-v8"));
    assert_eq!(body["uptime"], json!("up 3 days, 2 hours"));
    assert_eq!(body["os"], json!("error"));
    assert_eq!(body["model"], json!("error"));

    let (status, body) = agent.get("/storage/bogus").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = agent.get("/guardian/data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_memory"], json!("29G"));
    assert_eq!(body["kernel"], json!("6.6.31+rpt-rpi-v8"));
    assert_eq!(body["temp"], json!("error"));
}
