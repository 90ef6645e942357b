//! End-to-end tests against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port, then drives `AppContext` over real
//! HTTP with the cookie-keeping reqwest transport. Expiring or revoking tokens
//! on the shared `Backend` lets the tests watch the client's refresh path from
//! the server side.

use std::time::Duration;

use futures::future::join_all;
use inventory_core::api::AuthApi;
use inventory_core::types::{ListQuery, NewUser};
use inventory_core::{Access, AppContext, ClientConfig, MultipartForm, Params, ServiceError};
use mock_server::{Backend, Db, ADMIN_EMAIL, ADMIN_PASSWORD, OPERATOR_EMAIL, OPERATOR_PASSWORD};

async fn start() -> (Db, AppContext) {
    let backend = Backend::seeded();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with_backend(listener, backend.clone()));

    let ctx = AppContext::init(&ClientConfig::new(format!("http://{addr}"))).unwrap();
    (backend, ctx)
}

#[tokio::test]
async fn login_and_list_products() {
    let (_, ctx) = start().await;

    let user = ctx.auth.login(" Operario@Example.com ", OPERATOR_PASSWORD).await.unwrap();
    assert_eq!(user.email, OPERATOR_EMAIL);
    assert!(user.is_user());
    assert!(ctx.auth.is_authenticated().await);

    let envelope = ctx.products.list(&ListQuery::default()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.data.unwrap()["meta"]["total"], 3);
}

#[tokio::test]
async fn wrong_password_is_rejected_without_refresh() {
    let (backend, ctx) = start().await;

    let err = ctx.auth.login(ADMIN_EMAIL, "Wrong12345").await.unwrap_err();
    assert!(matches!(err, ServiceError::Rejected("INVALID_CREDENTIALS")));
    assert_eq!(backend.refresh_calls(), 0);
    assert!(!ctx.auth.is_authenticated().await);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_transparently() {
    let (backend, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    backend.expire_access_tokens().await;
    let envelope = ctx.products.list(&ListQuery::default()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(backend.refresh_calls(), 1);

    let envelope = ctx.categories.list(&ListQuery::default()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expiry_refreshes_once() {
    let (backend, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    backend.expire_access_tokens().await;
    backend.set_refresh_delay(Duration::from_millis(200));

    let handles = (0..4).map(|_| {
        let products = ctx.products.clone();
        tokio::spawn(async move { products.list(&ListQuery::default()).await })
    });
    for result in join_all(handles).await {
        let envelope = result.unwrap().unwrap();
        assert!(envelope.ok, "status {}", envelope.status);
    }
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn revoked_session_ends_in_401() {
    let (backend, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    backend.revoke_refresh_tokens().await;
    let envelope = ctx.products.list(&ListQuery::default()).await.unwrap();
    assert!(!envelope.ok);
    assert_eq!(envelope.status, 401);
    assert_eq!(envelope.error_code(), Some("UNAUTHORIZED"));
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn guards_follow_the_session() {
    let (backend, ctx) = start().await;

    assert_eq!(ctx.auth.require_auth().await, Access::Login);
    assert_eq!(backend.refresh_calls(), 1);

    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();
    assert!(matches!(ctx.auth.require_auth().await, Access::Granted(_)));
    assert_eq!(ctx.auth.require_admin().await, Access::Forbidden);
}

#[tokio::test]
async fn session_is_restored_from_cookies() {
    let (_, ctx) = start().await;
    ctx.auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    // A second service over the same client knows nothing yet and asks the backend.
    let auth = inventory_core::AuthService::new(AuthApi::new(ctx.client.clone()));
    assert!(!auth.is_authenticated().await);
    match auth.require_admin().await {
        Access::Granted(user) => assert_eq!(user.email, ADMIN_EMAIL),
        other => panic!("expected admin access, got {other:?}"),
    }
}

#[tokio::test]
async fn product_service_pages_and_guards_deletes() {
    let (_, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    let mut products = ctx.products_service();
    products.list_mut().set_ordering(inventory_core::paging::ListOrdering {
        order_by: Some("id".to_string()),
        order_dir: Some(inventory_core::types::OrderDir::Asc),
        limit: Some(2),
    });
    products.load_page(1).await.unwrap();
    assert_eq!(products.list().items().len(), 2);
    assert!(products.list().has_next());
    assert!(!products.list().has_prev());

    products.load_page(2).await.unwrap();
    assert_eq!(products.list().page(), 2);
    assert_eq!(products.list().items().len(), 1);
    assert!(!products.list().has_next());

    let mut movements = ctx.movements_service();
    movements.load_page(1).await.unwrap();
    let used = movements.list().items()[0]["productoId"].as_u64().unwrap();
    let err = products.remove(used).await.unwrap_err();
    assert_eq!(err.code(), "PRODUCT_HAS_MOVEMENTS");
}

#[tokio::test]
async fn admin_create_reports_taken_email() {
    let (_, ctx) = start().await;
    ctx.auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let admin = ctx.users_admin_service();
    let user = NewUser {
        name: "Otro Operario".to_string(),
        email: OPERATOR_EMAIL.to_string(),
        password: "Password123".to_string(),
        rol_id: 2,
    };
    assert_eq!(admin.create(&user).await.unwrap_err().code(), "EMAIL_TAKEN");

    let user = NewUser {
        email: "nuevo@example.com".to_string(),
        ..user
    };
    admin.create(&user).await.unwrap();
}

#[tokio::test]
async fn operator_cannot_list_admin_users() {
    let (_, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    let mut admin = ctx.users_admin_service();
    assert_eq!(admin.load_page(1).await.unwrap_err().code(), "USERS_LIST_ADMIN_FAILED");

    let mut users = ctx.users_service();
    users.load_page(1).await.unwrap();
    assert_eq!(users.list().meta().unwrap().total, 2);
}

#[tokio::test]
async fn avatar_upload_is_multipart() {
    let (_, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    let users = ctx.users_service();
    assert_eq!(
        users.upload_avatar(MultipartForm::new()).await.unwrap_err().code(),
        "FILE_REQUIRED"
    );

    let form = MultipartForm::new().file("avatar", "me.png", "image/png", vec![0x89, b'P', b'N', b'G']);
    let data = users.upload_avatar(form).await.unwrap().unwrap();
    assert_eq!(data["ok"], true);
    assert!(data["bytes"].as_u64().unwrap() > 4);
}

#[tokio::test]
async fn logout_clears_both_sides() {
    let (_, ctx) = start().await;
    ctx.auth.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    ctx.auth.logout().await;
    assert!(!ctx.auth.is_authenticated().await);
    assert_eq!(ctx.auth.require_auth().await, Access::Login);
}

#[tokio::test]
async fn movements_export_answers_csv_without_data() {
    let (_, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();

    let url = ctx.movements_service().export_csv_url();
    assert_eq!(url, format!("{}/movimientos/export", ctx.client.base_url()));
    assert_eq!(url, ctx.movements.export_csv_url());

    let path = url.strip_prefix(ctx.client.base_url()).unwrap();
    let envelope = ctx.client.get(path, Params::new()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.data, None);
}

#[tokio::test]
async fn explicit_refresh_renews_access() {
    let (backend, ctx) = start().await;
    ctx.auth.login(OPERATOR_EMAIL, OPERATOR_PASSWORD).await.unwrap();
    let auth = AuthApi::new(ctx.client.clone());

    backend.expire_access_tokens().await;
    let envelope = auth.refresh().await.unwrap();
    assert!(envelope.ok);
    let user: serde_json::Value = envelope.data.unwrap()["user"].clone();
    assert_eq!(user["email"], OPERATOR_EMAIL);
    assert_eq!(backend.refresh_calls(), 1);

    assert!(ctx.products.list(&ListQuery::default()).await.unwrap().ok);
    assert_eq!(backend.refresh_calls(), 1);

    backend.revoke_refresh_tokens().await;
    let envelope = auth.refresh().await.unwrap();
    assert_eq!(envelope.status, 401);
    assert_eq!(envelope.error_code(), Some("REFRESH_INVALID"));
    assert_eq!(backend.refresh_calls(), 2);
}
