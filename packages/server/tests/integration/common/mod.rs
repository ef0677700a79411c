use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use worker::{ExecutionClient, ExecutionError, ExecutionRequest, ExecutionResponse};

use server::config::{AppConfig, DatabaseConfig};
use server::entity::{problem, test_case};
use server::state::AppState;

/// How long to wait for an expected WebSocket event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-case delay of a `slow` script.
pub const SLOW_CASE: Duration = Duration::from_millis(300);

pub mod routes {
    pub const USERS: &str = "/api/v1/users";
    pub const MATCHES: &str = "/api/v1/matches";
    pub const ONLINE_PLAYERS: &str = "/api/v1/users/online";
    pub const LANGUAGES: &str = "/api/v1/languages";
    pub const ANTI_CHEAT_LOGS: &str = "/api/v1/anti-cheat/logs";
    pub const HEALTH: &str = "/health";

    pub fn profile(user_id: i32) -> String {
        format!("/api/v1/users/{user_id}/profile")
    }

    pub fn duel(id: i32) -> String {
        format!("/api/v1/matches/{id}")
    }

    pub fn cancel(id: i32) -> String {
        format!("/api/v1/matches/{id}/cancel")
    }

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }
}

/// Execution service stand-in driven by the submitted source code.
///
/// Test case inputs are their zero-based index, so a program can decide per
/// case whether to answer correctly:
///
/// * `pass all` - every case is accepted
/// * `pass N` - cases with index below N are accepted, the rest are wrong
/// * `unavailable` - every call fails with a network error
/// * `panic` - the client panics
///
/// Prefixing a script with `slow ` delays every case by [`SLOW_CASE`].
pub struct ScriptedExecutor;

#[async_trait]
impl ExecutionClient for ScriptedExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> worker::Result<ExecutionResponse> {
        let mut script = request.source_code.trim();
        if let Some(rest) = script.strip_prefix("slow ") {
            tokio::time::sleep(SLOW_CASE).await;
            script = rest;
        }
        if script == "unavailable" {
            return Err(ExecutionError::Network("connection refused".into()));
        }
        if script == "panic" {
            panic!("scripted executor panic");
        }

        let index: usize = request.stdin.trim().parse().unwrap_or(usize::MAX);
        let passes = match script.strip_prefix("pass ") {
            Some("all") => true,
            Some(n) => index < n.trim().parse::<usize>().unwrap_or(0),
            None => false,
        };

        let response = if passes {
            ExecutionResponse {
                status_id: ExecutionResponse::ACCEPTED,
                status_description: "Accepted".into(),
                stdout: request.expected_output.clone().map(|o| format!("{o}\n")),
                time_ms: Some(12.0),
                memory_kb: Some(2048),
                ..Default::default()
            }
        } else {
            ExecutionResponse {
                status_id: 4,
                status_description: "Wrong Answer".into(),
                stdout: Some("nope\n".into()),
                time_ms: Some(10.0),
                memory_kb: Some(1024),
                ..Default::default()
            }
        };
        Ok(response)
    }
}

/// A running test server backed by an in-memory SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub state: AppState,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a customized configuration.
    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig {
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                // A second connection would open a second, empty database.
                max_connections: 1,
                min_connections: 1,
                idle_timeout_secs: None,
                sqlx_logging: false,
                seed_sample_problems: false,
            },
            ..Default::default()
        };
        config.judge.workers = 2;
        customize(&mut config);

        let db = server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState::new(db.clone(), config, Arc::new(ScriptedExecutor))
            .expect("Failed to build app state");
        let app = server::build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            state,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_as(&self, path: &str, body: &Value, user_id: i32) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("X-User-Id", user_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_anonymous(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_as(&self, path: &str, user_id: i32) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("X-User-Id", user_id.to_string())
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Register a player and return its id.
    pub async fn create_user(&self, username: &str) -> i32 {
        let res = self
            .post_anonymous(routes::USERS, &json!({ "username": username }))
            .await;
        assert_eq!(res.status, 201, "User creation failed: {}", res.text);
        res.body["user_id"].as_i64().expect("user_id missing") as i32
    }

    pub async fn create_players(&self) -> (i32, i32) {
        (
            self.create_user("alice").await,
            self.create_user("bob").await,
        )
    }

    /// Insert a problem whose case `i` has input `i` and expected output `out-i`.
    pub async fn create_problem(&self, cases: usize) -> i32 {
        let problem = problem::ActiveModel {
            title: Set(format!("Problem with {cases} cases")),
            description: Set("Print `out-` followed by the input.".into()),
            difficulty: Set(1),
            time_limit_ms: Set(1000),
            memory_limit_mb: Set(128),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert problem");

        for i in 0..cases {
            test_case::ActiveModel {
                problem_id: Set(problem.id),
                position: Set(i as i32),
                input: Set(i.to_string()),
                expected_output: Set(format!("out-{i}")),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .expect("Failed to insert test case");
        }
        problem.id
    }

    /// Create a PENDING match as `player1` and return its id.
    pub async fn create_match(&self, player1: i32, player2: i32, problem_id: i32) -> i32 {
        let res = self
            .post_as(
                routes::MATCHES,
                &json!({ "opponent_id": player2, "problem_id": problem_id }),
                player1,
            )
            .await;
        assert_eq!(res.status, 201, "Match creation failed: {}", res.text);
        res.body["id"].as_i64().expect("id missing") as i32
    }

    pub async fn profile(&self, user_id: i32) -> Value {
        let res = self.get_anonymous(&routes::profile(user_id)).await;
        assert_eq!(res.status, 200, "Profile fetch failed: {}", res.text);
        res.body
    }

    pub async fn rating(&self, user_id: i32) -> i64 {
        self.profile(user_id).await["rating"].as_i64().unwrap()
    }

    /// Poll until the user's last socket has been torn down.
    pub async fn wait_offline(&self, user_id: i32) {
        for _ in 0..50 {
            if self.profile(user_id).await["is_online"] == false {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("User {user_id} is still online");
    }

    pub async fn duel(&self, match_id: i32) -> Value {
        let res = self.get_anonymous(&routes::duel(match_id)).await;
        assert_eq!(res.status, 200, "Match fetch failed: {}", res.text);
        res.body
    }

    pub async fn connect(&self, match_id: i32, user_id: i32) -> WsClient {
        let url = format!("ws://{}/ws/matches/{match_id}?user_id={user_id}", self.addr);
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("WebSocket connect failed");
        WsClient { stream }
    }

    /// Attempt a match socket upgrade; `Err` carries the HTTP status of a refusal.
    pub async fn try_connect(&self, match_id: i32, user_id: Option<i32>) -> Result<WsClient, u16> {
        let query = user_id.map(|id| format!("?user_id={id}")).unwrap_or_default();
        let url = format!("ws://{}/ws/matches/{match_id}{query}", self.addr);
        match tokio_tungstenite::connect_async(url).await {
            Ok((stream, _)) => Ok(WsClient { stream }),
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                Err(response.status().as_u16())
            }
            Err(e) => panic!("WebSocket connect failed: {e}"),
        }
    }

    /// Anonymous, read-only dashboard feed.
    pub async fn connect_dashboard(&self) -> WsClient {
        let url = format!("ws://{}/ws/dashboard", self.addr);
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("WebSocket connect failed");
        WsClient { stream }
    }

    /// Dashboard of a signed-in player; it receives `player_list` first.
    pub async fn connect_dashboard_as(&self, user_id: i32) -> WsClient {
        let url = format!("ws://{}/ws/dashboard?user_id={user_id}", self.addr);
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("WebSocket connect failed");
        WsClient { stream }
    }

    /// Problem, players, match, both sockets connected and `match.start` seen by both.
    pub async fn start_duel(&self, cases: usize) -> Duel {
        let (alice, bob) = self.create_players().await;
        let problem_id = self.create_problem(cases).await;
        let match_id = self.create_match(alice, bob, problem_id).await;

        let mut alice_ws = self.connect(match_id, alice).await;
        let mut bob_ws = self.connect(match_id, bob).await;
        alice_ws.expect_event("match.start").await;
        bob_ws.expect_event("match.start").await;

        Duel {
            match_id,
            alice,
            bob,
            alice_ws,
            bob_ws,
        }
    }
}

pub struct Duel {
    pub match_id: i32,
    pub alice: i32,
    pub bob: i32,
    pub alice_ws: WsClient,
    pub bob_ws: WsClient,
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send(&mut self, body: Value) {
        self.stream
            .send(Message::Text(body.to_string()))
            .await
            .expect("WebSocket send failed");
    }

    pub async fn submit(&mut self, code: &str, language: &str) {
        self.send(json!({ "action": "submit_code", "code": code, "language": language }))
            .await;
    }

    /// Next server event, or `None` once the server closed the socket.
    pub async fn next_event(&mut self) -> Option<Value> {
        loop {
            let msg = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for a WebSocket message")?;
            match msg {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).expect("Event is not JSON"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Skip events until one of type `kind` arrives; returns its payload.
    pub async fn expect_event(&mut self, kind: &str) -> Value {
        self.expect_matching(kind, |_| true).await
    }

    /// Skip events until one of type `kind` whose payload satisfies `accept` arrives.
    pub async fn expect_matching(&mut self, kind: &str, accept: impl Fn(&Value) -> bool) -> Value {
        loop {
            match self.next_event().await {
                Some(event) if event["type"] == kind && accept(&event["payload"]) => {
                    return event["payload"].clone();
                }
                Some(_) => continue,
                None => panic!("Socket closed before a matching '{kind}' event arrived"),
            }
        }
    }

    /// Wait for the verdict on one of `user_id`'s submissions.
    pub async fn expect_verdict(&mut self, user_id: i32) -> Value {
        self.expect_matching("submission_update", |p| p["user_id"] == user_id)
            .await
    }

    /// Collect event types until the server closes the socket.
    pub async fn drain_types(&mut self) -> Vec<String> {
        let mut kinds = Vec::new();
        while let Some(event) = self.next_event().await {
            kinds.push(event["type"].as_str().unwrap_or_default().to_string());
        }
        kinds
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
