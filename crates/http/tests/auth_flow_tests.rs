//! Login, restore and logout against a mocked auth backend

use linksphere_core::config::AuthConfig;
use linksphere_core::{KeyValueStoreExt, REFRESH_TOKEN_KEY, Role, SessionContext};
use linksphere_http::client::{ApiClient, ClientError};
use linksphere_http::types::{CreatePost, LoginRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_auth(server: &MockServer, context: SessionContext, default_role: Option<Role>) -> ApiClient {
    ApiClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .auth(AuthConfig {
            url: server.uri(),
            anon_key: "anon".to_string(),
            default_role,
        })
        .context(context)
        .build()
        .unwrap()
}

fn token_body(access: &str, refresh: &str, role: Option<&str>) -> Value {
    let metadata = role.map_or_else(|| json!({}), |role| json!({ "role": role }));
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 3600,
        "user": {
            "id": "u-1",
            "email": "member@linksphere.dev",
            "user_metadata": metadata
        }
    })
}

async fn mount_password_grant(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_populates_session() {
    let mock_server = MockServer::start().await;
    mount_password_grant(&mock_server, token_body("a-1", "r-1", Some("ADMIN"))).await;

    let context = SessionContext::in_memory();
    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = Arc::clone(&notified);
        context.session.subscribe(move |session| {
            assert!(session.is_authenticated());
            notified.fetch_add(1, Ordering::SeqCst);
        });
    }

    let client = client_with_auth(&mock_server, context.clone(), None);
    let data = client
        .login(&LoginRequest::new("member@linksphere.dev", "secret"))
        .await
        .unwrap();

    assert_eq!(data.role, Role::Admin);
    assert_eq!(data.user.email, "member@linksphere.dev");
    assert_eq!(context.session.access_token().as_deref(), Some("a-1"));
    assert_eq!(context.session.role(), Some(Role::Admin));
    assert_eq!(
        context.storage.get_item::<String>(REFRESH_TOKEN_KEY).as_deref(),
        Some("r-1")
    );
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    let requests = mock_server.received_requests().await.unwrap();
    let sent: Value = requests[0].body_json().unwrap();
    assert_eq!(
        sent,
        json!({"email": "member@linksphere.dev", "password": "secret"})
    );
}

#[tokio::test]
async fn test_login_never_sends_bearer() {
    let mock_server = MockServer::start().await;
    mount_password_grant(&mock_server, token_body("a-2", "r-2", Some("USER"))).await;

    let context = SessionContext::in_memory();
    context.session.set_auth("old-token", Role::User, None);

    let client = client_with_auth(&mock_server, context, None);
    client
        .login(&LoginRequest::new("member@linksphere.dev", "secret"))
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_without_role_fails_closed() {
    let mock_server = MockServer::start().await;
    mount_password_grant(&mock_server, token_body("a-3", "r-3", None)).await;

    let context = SessionContext::in_memory();
    let client = client_with_auth(&mock_server, context.clone(), None);

    let err = client
        .login(&LoginRequest::new("member@linksphere.dev", "secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(!context.session.is_authenticated());
    assert_eq!(context.storage.get_item::<String>(REFRESH_TOKEN_KEY), None);
}

#[tokio::test]
async fn test_login_without_role_uses_configured_default() {
    let mock_server = MockServer::start().await;
    mount_password_grant(&mock_server, token_body("a-4", "r-4", None)).await;

    let context = SessionContext::in_memory();
    let client = client_with_auth(&mock_server, context.clone(), Some(Role::User));

    let data = client
        .login(&LoginRequest::new("member@linksphere.dev", "secret"))
        .await
        .unwrap();
    assert_eq!(data.role, Role::User);
    assert_eq!(context.session.role(), Some(Role::User));
}

#[tokio::test]
async fn test_login_rejects_bad_input_locally() {
    let mock_server = MockServer::start().await;
    let client = client_with_auth(&mock_server, SessionContext::in_memory(), None);

    let err = client
        .login(&LoginRequest::new("not-an-email", "secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_session_from_stored_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({"refresh_token": "r-legacy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a-5", "r-5", Some("USER"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = SessionContext::in_memory();
    // Plain text written before values were JSON encoded
    context
        .storage
        .set_raw(REFRESH_TOKEN_KEY, "r-legacy".to_string())
        .unwrap();

    let client = client_with_auth(&mock_server, context.clone(), None);
    assert!(client.restore_session().await);
    assert_eq!(context.session.access_token().as_deref(), Some("a-5"));
    assert_eq!(
        context.storage.get_raw(REFRESH_TOKEN_KEY).unwrap().as_deref(),
        Some("\"r-5\"")
    );

    // Already authenticated: no further backend call
    assert!(client.restore_session().await);
}

#[tokio::test]
async fn test_restore_session_without_token() {
    let mock_server = MockServer::start().await;
    let context = SessionContext::in_memory();
    let client = client_with_auth(&mock_server, context.clone(), None);

    assert!(!client.restore_session().await);
    assert!(!context.session.is_authenticated());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_session_rejected_token_is_dropped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let context = SessionContext::in_memory();
    context.storage.set_item(REFRESH_TOKEN_KEY, "r-dead").unwrap();

    let client = client_with_auth(&mock_server, context.clone(), None);
    assert!(!client.restore_session().await);
    assert_eq!(context.storage.get_item::<String>(REFRESH_TOKEN_KEY), None);
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer a-6"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = SessionContext::in_memory();
    context.session.set_auth("a-6", Role::User, None);
    context.storage.set_item(REFRESH_TOKEN_KEY, "r-6").unwrap();

    let client = client_with_auth(&mock_server, context.clone(), None);
    client.logout().await;

    assert!(!context.session.is_authenticated());
    assert_eq!(context.session.role(), None);
    assert_eq!(context.storage.get_item::<String>(REFRESH_TOKEN_KEY), None);
}

#[tokio::test]
async fn test_create_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/post"))
        .and(header("authorization", "Bearer a-7"))
        .and(body_json(json!({
            "url": "https://example.com/rust",
            "categories": ["dev"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
            "user_id": "8d444840-9dc0-11d1-b245-5ffdce74fad2",
            "url": "https://example.com/rust",
            "title": "Rust",
            "categories": ["dev"],
            "view_count": 3,
            "created_at": "2024-05-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = SessionContext::in_memory();
    context.session.set_auth("a-7", Role::User, None);
    let client = client_with_auth(&mock_server, context, None);

    let post = client
        .create_post(CreatePost::new("https://example.com/rust").with_categories(["dev", "", "dev"]))
        .await
        .unwrap();
    assert_eq!(post.title, "Rust");
    assert_eq!(post.view_count, 3);
}

#[tokio::test]
async fn test_create_post_rejects_invalid_url() {
    let mock_server = MockServer::start().await;
    let client = client_with_auth(&mock_server, SessionContext::in_memory(), None);

    let err = client
        .create_post(CreatePost::new("ftp://example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}
