use std::{fs, net::SocketAddr, path::Path, sync::Arc};

use jsonmock::filewatcher::watcher::scan_directory;
use jsonmock::http::{dispatch::Dispatcher, router::RouteTable, server};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
};

struct TestServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(dir: &Path, prefix: &str) -> Self {
        let table = Arc::new(RouteTable::new(dir, prefix));
        scan_directory(&table).unwrap();
        let listener = server::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Arc::new(Dispatcher::new(table, "127.0.0.1", addr.port()));
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::run(listener, dispatcher, async {
            let _ = rx.await;
        }));
        TestServer { addr, shutdown, handle }
    }

    async fn send(&self, raw: &str) -> (u16, String, Vec<u8>) {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await.unwrap();

        let split = data
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header terminator");
        let head = String::from_utf8_lossy(&data[..split]).to_string();
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("response has a status code");
        (status, head, data[split + 4..].to_vec())
    }

    async fn get(&self, path: &str) -> (u16, String, Vec<u8>) {
        self.send(&format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)).await
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap();
    }
}

#[tokio::test]
async fn serves_every_variant() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ping.json"), r#"{"url":"/ping","response":{"ok":true}}"#).unwrap();
    fs::write(
        dir.path().join("list.json"),
        r#"{"url":"/list","response":[1,2,3],"http_code":201}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("file.json"),
        r#"{"url":"/file","response":"payload.txt","headers":{"Content-Type":"text/plain"}}"#,
    )
    .unwrap();
    fs::write(dir.path().join("payload.txt"), "plain text").unwrap();
    fs::write(dir.path().join("gone.json"), r#"{"url":"/gone","response":"missing.txt"}"#).unwrap();

    let server = TestServer::start(dir.path(), "").await;

    let (status, head, body) = server.get("/ping").await;
    assert_eq!(status, 200);
    assert!(head.contains("Content-Type: application/json"));
    assert_eq!(String::from_utf8(body).unwrap(), "{\n  \"ok\": true\n}");

    let (status, _, body) = server.get("/list").await;
    assert_eq!(status, 201);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([1, 2, 3]));

    let (status, head, body) = server.get("/file").await;
    assert_eq!(status, 200);
    assert!(head.contains("Content-Type: text/plain"));
    assert_eq!(body, b"plain text");

    let (status, head, body) = server.get("/gone").await;
    assert_eq!(status, 200);
    assert!(head.contains("Content-Length: 0"));
    assert!(body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn unknown_url_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), "").await;

    let (status, head, body) = server.get("/nothing/here").await;
    assert_eq!(status, 404);
    assert!(head.contains("Content-Type: application/json"));
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({"404": "Response not found."})
    );

    server.stop().await;
}

#[tokio::test]
async fn prefix_and_method_are_part_of_the_route() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("create.json"),
        r#"{"url":"users","http_method":"post","http_code":201,"response":{"id":7}}"#,
    )
    .unwrap();
    let server = TestServer::start(dir.path(), "/api").await;

    let request = "POST /api/users HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"name\":\"x\"}\n";
    let (status, _, body) = server.send(request).await;
    assert_eq!(status, 201);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"id": 7}));

    assert_eq!(server.get("/api/users").await.0, 404);
    assert_eq!(server.send("POST /users HTTP/1.1\r\n\r\n").await.0, 404);

    server.stop().await;
}

#[tokio::test]
async fn malformed_request_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), "").await;

    let (status, _, _) = server.send("GARBAGE\r\n\r\n").await;
    assert_eq!(status, 400);

    server.stop().await;
}

#[tokio::test]
async fn oversized_body_is_refused_and_server_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ping.json"), r#"{"url":"/ping","response":{"ok":true}}"#).unwrap();
    let server = TestServer::start(dir.path(), "").await;

    let (status, _, _) = server
        .send("POST /ping HTTP/1.1\r\nContent-Length: 100000000000000\r\n\r\n")
        .await;
    assert_eq!(status, 413);

    let (status, _, _) = server.send("POST /ping HTTP/1.1\r\nContent-Length: ten\r\n\r\n").await;
    assert_eq!(status, 400);

    assert_eq!(server.get("/ping").await.0, 200);

    server.stop().await;
}

#[tokio::test]
async fn head_answers_without_body() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("head.json"),
        r#"{"url":"/ping","http_method":"HEAD","response":{"ok":true}}"#,
    )
    .unwrap();
    let server = TestServer::start(dir.path(), "").await;

    let (status, head, body) = server.send("HEAD /ping HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    let expected_length = "{\n  \"ok\": true\n}".len();
    assert!(head.contains(&format!("Content-Length: {}", expected_length)));
    assert!(body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn request_method_is_case_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ping.json"), r#"{"url":"/ping","response":[]}"#).unwrap();
    let server = TestServer::start(dir.path(), "").await;

    assert_eq!(server.send("get /ping HTTP/1.1\r\n\r\n").await.0, 404);
    assert_eq!(server.get("/ping").await.0, 200);

    server.stop().await;
}
