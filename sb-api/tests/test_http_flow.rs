mod common;

use sb_api::TicketFilters;
use sb_core::error::SbError;

#[tokio::test]
async fn test_login_posts_form_and_keeps_token() {
    let stub = common::serve(vec![
        (
            200,
            r#"{"token":"jwt-1","user":{"id":1,"name":"Admin User","email":"admin@banco.com","role":"admin"}}"#,
        ),
        (200, r#"{"valid":true,"user":{"email":"admin@banco.com"}}"#),
    ])
    .await;
    let mut client = stub.client();

    let login = client.login("admin@banco.com", "s3cret").await.unwrap();
    assert_eq!(login.user.role, "admin");
    assert!(client.verify_token().await.unwrap());

    let requests = stub.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/v1/auth/login");
    assert_eq!(
        requests[0].header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(requests[0].body, "username=admin%40banco.com&password=s3cret");
    assert_eq!(requests[1].path, "/api/v1/auth/verify");
    assert_eq!(requests[1].header("authorization"), Some("Bearer jwt-1"));
}

#[tokio::test]
async fn test_bad_credentials_map_to_auth_failed() {
    let stub = common::serve(vec![(401, r#"{"detail":"Credenciales incorrectas"}"#)]).await;
    let mut client = stub.client();

    let err = client.login("admin@banco.com", "nope").await.unwrap_err();
    assert!(matches!(err, SbError::AuthFailed(ref m) if m == "Credenciales incorrectas"));
    assert!(!client.has_token());
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_list_tickets_with_filters_and_envelope() {
    let stub = common::serve(vec![(
        200,
        r#"{"tickets":[{"id":7,"subject":"Tarjeta bloqueada","status":"open","priority":"high"}],"total":1}"#,
    )])
    .await;
    let client = stub.client().with_token("jwt-2");

    let filters = TicketFilters::default().status("open").priority("all");
    let tickets = client.list_tickets(&filters).await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].id, 7);
    assert_eq!(tickets[0].title(), "Tarjeta bloqueada");

    let requests = stub.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/api/v1/tickets?status=open");
}

#[tokio::test]
async fn test_ticket_status_patch_body() {
    let stub = common::serve(vec![(200, r#"{"id":7,"status":"resolved"}"#)]).await;
    let client = stub.client().with_token("jwt-3");

    client.update_ticket_status(7, "resolved").await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/api/v1/tickets/7/status");
    assert_eq!(requests[0].json(), serde_json::json!({"status": "resolved"}));
}

#[tokio::test]
async fn test_retries_on_503_then_succeeds() {
    let stub = common::serve(vec![
        (503, r#"{"detail":"warming up"}"#),
        (503, r#"{"detail":"warming up"}"#),
        (200, r#"{"status":"healthy"}"#),
    ])
    .await;
    let client = stub.client();

    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(stub.requests().len(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_returns_server_error() {
    let stub = common::serve(vec![
        (502, ""),
        (502, ""),
        (502, ""),
        (502, r#"{"detail":"upstream down"}"#),
    ])
    .await;
    let client = stub.client();

    let err = client.health().await.unwrap_err();
    assert!(matches!(err, SbError::ServerError { status: 502, ref message } if message == "upstream down"));
    assert_eq!(stub.requests().len(), 4);
}

#[tokio::test]
async fn test_widget_conversation_flow() {
    let stub = common::serve(vec![
        (
            200,
            r#"{"conversation_id":"c-9","status":"started","messages":[{"role":"assistant","content":"Hola"}]}"#,
        ),
        (
            200,
            r#"{"message":"Tu saldo es...","metadata":{"intent":"balance"},"conversation_id":"c-9"}"#,
        ),
        (
            200,
            r#"{"ticket_id":12,"status":"escalated","message":"Conversación escalada exitosamente"}"#,
        ),
        (404, r#"{"detail":"Conversation not found"}"#),
    ])
    .await;
    let client = stub.client();

    let started = client.start_conversation(None).await.unwrap();
    assert_eq!(started.conversation_id, "c-9");

    let reply = client
        .send_chat_message("c-9", " saldo ", None)
        .await
        .unwrap();
    assert_eq!(reply.message, "Tu saldo es...");

    let escalation = client
        .escalate_conversation("c-9", "account", "medium", None)
        .await
        .unwrap();
    assert_eq!(escalation.ticket_id, 12);

    let err = client.chat_history("gone").await.unwrap_err();
    assert!(matches!(err, SbError::NotFound(_)));

    let requests = stub.requests();
    let start = requests[0].json();
    assert!(start["user_id"].as_str().unwrap().starts_with("user_"));
    assert_eq!(start["metadata"]["source"], "web-widget");
    assert!(requests[0].header("authorization").is_none());

    let message = requests[1].json();
    assert_eq!(message["message"], "saldo");
    assert_eq!(message["context"], serde_json::json!({}));

    assert_eq!(requests[2].path, "/api/v1/chat/escalate");
    assert_eq!(requests[2].json()["category"], "account");
    assert_eq!(requests[3].path, "/api/v1/chat/history/gone");
}
