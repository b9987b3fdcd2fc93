use std::net::TcpListener;
use std::path::{Path, PathBuf};

use fleetroute_config::AppConfig;
use fleetroute_gateway::GatewayServer;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Pick a random available port.
fn random_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to random port");
    listener.local_addr().unwrap().port()
}

fn shipped_migrations() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations")
}

/// Build a config with its database inside `data_dir`.
fn test_config(port: u16, data_dir: &Path, migrations_dir: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.database.path = data_dir.join("data.sqlite");
    config.database.migrations_dir = migrations_dir;
    config
}

/// Bootstrap the gateway, start it in the background and return its base URL.
async fn start_test_gateway(config: AppConfig) -> String {
    let port = config.server.port;
    let server = GatewayServer::bootstrap(config).expect("bootstrap failed");
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Wait for the server to be ready
    for _ in 0..50 {
        if TcpListener::bind(format!("127.0.0.1:{port}")).is_err() {
            break; // port is in use = server is up
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    format!("http://127.0.0.1:{port}")
}

async fn started() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(random_port(), dir.path(), shipped_migrations());
    let base = start_test_gateway(config).await;
    (dir, base)
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .expect("post failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("{base}{path}")).await.expect("get failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (_dir, base) = started().await;

    let resp = reqwest::get(format!("{base}/health"))
        .await
        .expect("health request failed");
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn status_endpoint_reports_migrations() {
    let (_dir, base) = started().await;

    let (status, body) = get(&base, "/api/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "running");
    assert_eq!(body["migrations_applied"], 4);
}

#[tokio::test]
async fn full_route_lifecycle() {
    let (_dir, base) = started().await;

    let (status, vehicle) = post(&base, "/vehicles", json!({"plate_number": "XYZ789"})).await;
    assert_eq!(status, 201);

    let (status, driver) = post(
        &base,
        "/car-drivers",
        json!({
            "name": "John Doe",
            "phone_number": "1234567890",
            "email": "john@example.com",
            "license_number": "LIC12345",
        }),
    )
    .await;
    assert_eq!(status, 201);

    let (status, route) = post(
        &base,
        "/routes",
        json!({
            "name": "Downtown",
            "description": "Morning deliveries",
            "vehicle_id": vehicle["id"],
            "driver_id": driver["id"],
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(route["status"], "pending");
    assert_eq!(route["vehicle"]["plate_number"], "XYZ789");
    assert_eq!(route["driver"]["name"], "John Doe");

    let (status, point) = post(
        &base,
        "/route-points/add-purchase-order",
        json!({
            "route_id": route["id"],
            "purchase_order_id": "PO12345",
            "latitude": -34.6037,
            "longitude": -58.3816,
            "address": "Av. Corrientes 1234",
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(point["status"], "pending");

    let route_id = route["id"].as_str().unwrap();
    let (status, fetched) = get(&base, &format!("/routes/{route_id}")).await;
    assert_eq!(status, 200);
    let points = fetched["route_points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["purchase_order_id"], "PO12345");

    let point_id = point["id"].as_str().unwrap();
    let (status, _) = get(&base, &format!("/route-points/{point_id}")).await;
    assert_eq!(status, 200);

    let (_, routes) = get(&base, "/routes").await;
    assert_eq!(routes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected() {
    let (_dir, base) = started().await;

    let (status, body) = post(
        &base,
        "/route-points/add-purchase-order",
        json!({
            "route_id": uuid_like(),
            "purchase_order_id": "PO1",
            "latitude": 123.0,
            "longitude": 0.0,
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("latitude"));
}

#[tokio::test]
async fn restart_reuses_database_without_reapplying() {
    let dir = tempfile::tempdir().unwrap();

    let first = GatewayServer::bootstrap(test_config(random_port(), dir.path(), shipped_migrations()))
        .unwrap();
    drop(first);

    let port = random_port();
    let base = start_test_gateway(test_config(port, dir.path(), shipped_migrations())).await;
    let (_, body) = get(&base, "/api/status").await;
    assert_eq!(body["migrations_applied"], 4);
}

#[test]
fn bootstrap_fails_on_missing_migrations_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(random_port(), dir.path(), dir.path().join("missing"));

    let err = GatewayServer::bootstrap(config).err().expect("bootstrap should fail");
    assert!(err.to_string().contains("migrations directory does not exist"));
}

#[test]
fn bootstrap_fails_on_broken_script() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    std::fs::create_dir_all(&migrations).unwrap();
    std::fs::write(migrations.join("001_ok.sql"), "CREATE TABLE ok (id INTEGER);").unwrap();
    std::fs::write(migrations.join("002_bad.sql"), "CREATE TABLE").unwrap();

    let config = test_config(random_port(), dir.path(), migrations);
    let err = GatewayServer::bootstrap(config).err().expect("bootstrap should fail");
    assert!(err.to_string().contains("002_bad.sql"));
}

fn uuid_like() -> &'static str {
    "00000000-0000-4000-8000-000000000000"
}
