//! HTTP routes for the administered group.
//!
//! Every route answers with plain text except `/group/members`, which
//! returns a JSON array of user ids. Required query parameters are checked
//! before any backend call. A handler panic is turned into a 500 by a
//! layer shared by all routes, and the server keeps serving.

use std::any::Any;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use groupgate_core::{ContactCard, Jid, ParticipantAction, ParticipantChangeRequest};
use groupgate_session::{ContactMessage, OutgoingMessage, SessionManager};

use crate::error::ApiError;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    session: Arc<SessionManager>,
    group: Arc<Jid>,
}

impl AppState {
    /// Creates handler state for one session and one group.
    pub fn new(session: Arc<SessionManager>, group: Jid) -> Self {
        Self {
            session,
            group: Arc::new(group),
        }
    }

    /// Returns the administered group.
    pub fn group(&self) -> &Jid {
        &self.group
    }
}

/// Builds the router with all routes and the shared layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/group/members", get(list_members))
        .route("/group/add", get(add_member))
        .route("/group/remove", get(remove_member))
        .route("/group/send_contact", get(send_contact))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Raw query pairs in request order. Repeated keys are kept.
type QueryPairs = Vec<(String, String)>;

/// Returns the first value for `key`, trimmed; empty counts as missing.
fn required(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn health(State(state): State<AppState>) -> Response {
    if state.session.is_connected() {
        (StatusCode::OK, "Connected").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not connected").into_response()
    }
}

async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let info = state
        .session
        .group_info(state.group())
        .await
        .map_err(|e| ApiError::provider("Failed to get group info", e))?;
    Ok(Json(info.participant_users()))
}

async fn add_member(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> Result<&'static str, ApiError> {
    change_membership(&state, &query, ParticipantAction::Add).await?;
    Ok("Member added")
}

async fn remove_member(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> Result<&'static str, ApiError> {
    change_membership(&state, &query, ParticipantAction::Remove).await?;
    Ok("Member removed")
}

async fn change_membership(
    state: &AppState,
    query: &[(String, String)],
    action: ParticipantAction,
) -> Result<(), ApiError> {
    let phone = required(query, "phone").ok_or(ApiError::Validation("Missing phone parameter"))?;
    let request = ParticipantChangeRequest::new(phone, action);
    let context = match action {
        ParticipantAction::Add => "Failed to add member",
        ParticipantAction::Remove => "Failed to remove member",
    };

    let changes = state
        .session
        .update_participant(state.group(), &request)
        .await
        .map_err(|e| ApiError::provider(context, e))?;

    // Per-participant outcomes do not change the response.
    for change in changes.iter().filter(|c| !c.is_applied()) {
        warn!(
            participant = %change.jid,
            status = change.status,
            %action,
            "Participant change not applied"
        );
    }
    info!(participant = %request.participant(), %action, "Membership updated");
    Ok(())
}

async fn send_contact(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> Result<&'static str, ApiError> {
    let (Some(name), Some(phone)) = (required(&query, "name"), required(&query, "phone")) else {
        return Err(ApiError::Validation("Missing name or phone parameter"));
    };

    let card = ContactCard::new(name, phone);
    let message = OutgoingMessage::Contact(ContactMessage::from_card(&card));
    let receipt = state
        .session
        .send_message(state.group(), message)
        .await
        .map_err(|e| ApiError::provider("Failed to send contact", e))?;

    info!(id = %receipt.id, contact = %card.display_name, "Contact sent");
    Ok("Contact sent")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "Recovered from handler panic");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use groupgate_session::{
        BoxFuture, ClientErrorCode, ClientResult, CredentialStore, DeviceIdentity, GroupInfo,
        MemoryClient, MemoryCredentialStore, MessagingClient, PairingEvents, ParticipantChange,
        SendReceipt,
    };
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;

    fn group() -> Jid {
        Jid::group("1234567890-123456789")
    }

    fn paired_store() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_identity(DeviceIdentity::new(
            Jid::participant("15550000000"),
            7,
            "key",
            "test",
        )))
    }

    async fn connected(client: Arc<MemoryClient>, store: Arc<dyn CredentialStore>) -> AppState {
        let session = SessionManager::new(client, store);
        session.connect(&CancellationToken::new()).await.unwrap();
        AppState::new(Arc::new(session), group())
    }

    async fn setup(members: &[&str]) -> (Arc<MemoryClient>, Router) {
        let store = paired_store();
        let client = Arc::new(MemoryClient::new(store.clone()).with_group(
            group(),
            "Test group",
            members.iter().map(|m| Jid::participant(*m)),
        ));
        let state = connected(client.clone(), store).await;
        (client, router(state))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_connection() {
        let (client, app) = setup(&[]).await;
        assert_eq!(get(&app, "/health").await, (StatusCode::OK, "Connected".into()));

        client.drop_connection();
        assert_eq!(
            get(&app, "/health").await,
            (StatusCode::SERVICE_UNAVAILABLE, "Not connected".into())
        );
    }

    #[tokio::test]
    async fn members_returns_users_in_order() {
        let (_client, app) = setup(&["111", "222", "333"]).await;

        let (status, body) = get(&app, "/group/members").await;

        assert_eq!(status, StatusCode::OK);
        let users: Vec<String> = serde_json::from_str(&body).unwrap();
        assert_eq!(users, vec!["111", "222", "333"]);
    }

    #[tokio::test]
    async fn missing_phone_is_rejected_without_backend_call() {
        let (client, app) = setup(&[]).await;

        for uri in [
            "/group/add",
            "/group/add?phone=",
            "/group/add?phone=%20%20",
            "/group/remove",
            "/group/send_contact?name=Alice",
            "/group/send_contact?phone=15551234567",
            "/group/send_contact?name=&phone=15551234567",
        ] {
            let (status, _) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn validation_messages() {
        let (_client, app) = setup(&[]).await;
        assert_eq!(get(&app, "/group/add").await.1, "Missing phone parameter");
        assert_eq!(
            get(&app, "/group/send_contact").await.1,
            "Missing name or phone parameter"
        );
    }

    #[tokio::test]
    async fn add_then_remove_member() {
        let (client, app) = setup(&["111"]).await;

        let (status, body) = get(&app, "/group/add?phone=15551234567").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Member added"));
        assert!(
            client
                .participants(&group())
                .contains(&Jid::participant("15551234567"))
        );

        let (status, body) = get(&app, "/group/remove?phone=15551234567").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Member removed"));
        assert_eq!(client.participants(&group()), vec![Jid::participant("111")]);
    }

    #[tokio::test]
    async fn adding_twice_equals_adding_once() {
        let (once_client, once_app) = setup(&["111"]).await;
        let (twice_client, twice_app) = setup(&["111"]).await;

        let (status, _) = get(&once_app, "/group/add?phone=15551234567").await;
        assert_eq!(status, StatusCode::OK);
        for _ in 0..2 {
            let (status, body) = get(&twice_app, "/group/add?phone=15551234567").await;
            assert_eq!((status, body.as_str()), (StatusCode::OK, "Member added"));
        }

        assert_eq!(
            twice_client.participants(&group()),
            once_client.participants(&group())
        );
        assert_eq!(
            twice_client.participants(&group()),
            vec![Jid::participant("111"), Jid::participant("15551234567")]
        );
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let (client, app) = setup(&[]).await;
        client.fail_requests_with(ClientErrorCode::Forbidden, "not a group admin");

        let (status, body) = get(&app, "/group/add?phone=15551234567").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Failed to add member: "));
        assert!(body.contains("not a group admin"));

        let (status, body) = get(&app, "/group/members").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Failed to get group info: "));
    }

    #[tokio::test]
    async fn send_contact_sends_vcard() {
        let (client, app) = setup(&[]).await;

        let (status, body) = get(&app, "/group/send_contact?name=Alice%20Smith&phone=15551234567").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Contact sent"));

        let sent = client.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, group());
        let OutgoingMessage::Contact(contact) = &sent[0].message else {
            panic!("expected a contact message");
        };
        assert_eq!(contact.display_name, "Alice Smith");
        assert!(contact.vcard.contains("\nFN:Alice Smith\n"));
        assert!(contact.vcard.contains("\nTEL;TYPE=CELL:15551234567\n"));
    }

    struct PanickingClient;

    impl MessagingClient for PanickingClient {
        fn name(&self) -> &str {
            "panicking"
        }

        fn pairing_events(&self) -> ClientResult<PairingEvents> {
            Err(groupgate_session::ClientError::already_paired("paired"))
        }

        fn connect(&self) -> BoxFuture<'_, ClientResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn disconnect(&self) {}

        fn is_connected(&self) -> bool {
            true
        }

        fn group_info(&self, _group: Jid) -> BoxFuture<'_, ClientResult<GroupInfo>> {
            panic!("group lookup exploded")
        }

        fn update_group_participants(
            &self,
            _group: Jid,
            _participants: Vec<Jid>,
            _action: ParticipantAction,
        ) -> BoxFuture<'_, ClientResult<Vec<ParticipantChange>>> {
            panic!("participant update exploded")
        }

        fn send_message(
            &self,
            _to: Jid,
            _message: OutgoingMessage,
        ) -> BoxFuture<'_, ClientResult<SendReceipt>> {
            panic!("send exploded")
        }
    }

    #[tokio::test]
    async fn panic_becomes_500_and_server_keeps_serving() {
        let session = SessionManager::new(Arc::new(PanickingClient), paired_store());
        session.connect(&CancellationToken::new()).await.unwrap();
        let app = router(AppState::new(Arc::new(session), group()));

        let (status, body) = get(&app, "/group/members").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal server error");

        let (status, _) = get(&app, "/group/add?phone=1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(get(&app, "/health").await, (StatusCode::OK, "Connected".into()));
    }

    #[test]
    fn required_takes_first_value_trimmed() {
        let pairs = vec![
            ("phone".to_string(), " 123 ".to_string()),
            ("phone".to_string(), "456".to_string()),
            ("name".to_string(), "   ".to_string()),
        ];
        assert_eq!(required(&pairs, "phone"), Some("123".into()));
        assert_eq!(required(&pairs, "name"), None);
        assert_eq!(required(&pairs, "missing"), None);
    }

    #[tokio::test]
    async fn repeated_parameter_uses_first_value() {
        let (client, app) = setup(&[]).await;

        let (status, body) = get(&app, "/group/add?phone=15551234567&phone=15559999999").await;

        assert_eq!((status, body.as_str()), (StatusCode::OK, "Member added"));
        assert_eq!(
            client.participants(&group()),
            vec![Jid::participant("15551234567")]
        );

        let (status, body) =
            get(&app, "/group/send_contact?name=Alice&name=Bob&phone=1&phone=2").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Contact sent"));
        let OutgoingMessage::Contact(contact) = &client.sent_messages()[0].message else {
            panic!("expected a contact message");
        };
        assert_eq!(contact.display_name, "Alice");
        assert!(contact.vcard.contains("\nTEL;TYPE=CELL:1\n"));
    }

    #[tokio::test]
    async fn empty_first_value_is_missing() {
        let (client, app) = setup(&[]).await;

        let (status, body) = get(&app, "/group/add?phone=&phone=15551234567").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing phone parameter");
        assert_eq!(client.calls(), 0);
    }
}
