//! End-to-end checks over a real TCP listener.

use std::sync::Arc;
use std::time::Duration;

use groupgate_core::Jid;
use groupgate_server::{AppState, HttpServer, ServerConfig, ShutdownCoordinator, router};
use groupgate_session::{
    ClientErrorCode, DeviceIdentity, MemoryClient, MemoryCredentialStore, SessionManager,
};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

struct Running {
    base: String,
    client: Arc<MemoryClient>,
    session: Arc<SessionManager>,
    shutdown: ShutdownCoordinator,
    supervisor: JoinHandle<groupgate_server::ServerResult<()>>,
}

async fn start(members: &[&str]) -> Running {
    let group = Jid::group("1234567890-123456789");
    let store = Arc::new(MemoryCredentialStore::with_identity(DeviceIdentity::new(
        Jid::participant("15550000000"),
        1,
        "key",
        "test",
    )));
    let client = Arc::new(MemoryClient::new(store.clone()).with_group(
        group.clone(),
        "Integration",
        members.iter().map(|m| Jid::participant(*m)),
    ));
    let session = Arc::new(SessionManager::new(client.clone(), store));
    let shutdown = ShutdownCoordinator::new();
    session.connect(&shutdown.token()).await.unwrap();

    let config = ServerConfig::new(group.clone())
        .with_listen("127.0.0.1:0".parse().unwrap())
        .with_drain_timeout(Duration::from_secs(2));
    let server = HttpServer::bind(&config).await.unwrap();
    let base = format!("http://{}", server.local_addr());
    let app = router(AppState::new(session.clone(), group));
    let serving = tokio::spawn(server.serve(app, shutdown.token().cancelled_owned()));

    let supervisor = {
        let shutdown = shutdown.clone();
        let session = session.clone();
        tokio::spawn(async move {
            shutdown
                .supervise(&session, serving, config.drain_timeout)
                .await
        })
    };

    Running {
        base,
        client,
        session,
        shutdown,
        supervisor,
    }
}

async fn get(base: &str, path: &str) -> (StatusCode, String) {
    let response = reqwest::get(format!("{base}{path}")).await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn serves_group_routes() {
    let app = start(&["111", "222"]).await;

    assert_eq!(
        get(&app.base, "/health").await,
        (StatusCode::OK, "Connected".to_string())
    );

    let (status, body) = get(&app.base, "/group/add?phone=333").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "Member added"));

    let (status, body) = get(&app.base, "/group/members").await;
    assert_eq!(status, StatusCode::OK);
    let users: Vec<String> = serde_json::from_str(&body).unwrap();
    assert_eq!(users, vec!["111", "222", "333"]);

    let (status, _) = get(&app.base, "/group/remove").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.client
        .fail_requests_with(ClientErrorCode::NetworkError, "socket closed");
    let (status, body) = get(&app.base, "/group/remove?phone=111").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("Failed to remove member: "));

    app.shutdown.trigger();
    app.supervisor.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_stops_listener_and_disconnects() {
    let app = start(&[]).await;
    assert!(app.session.is_connected());

    app.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), app.supervisor)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(!app.session.is_connected());
    assert!(reqwest::get(format!("{}/health", app.base)).await.is_err());
}
