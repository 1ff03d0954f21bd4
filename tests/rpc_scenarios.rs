//! End-to-end calls through the client stubs against a loopback server

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use std::time::Duration;

use auth_rpc::config::{AuthConfig, BootstrapAdmin};
use auth_rpc::directory::{Credentials, Role, Token, User};
use auth_rpc::error::{ErrorKind, RpcError};
use auth_rpc::service::{ClientStub, RemoteAuthenticationService, RemoteUserDirectory};

fn remote_kind(err: RpcError) -> ErrorKind {
    match err {
        RpcError::RemoteOperationFailed { kind, .. } => kind,
        other => panic!("expected a remote failure, got {other:?}"),
    }
}

fn alice() -> User {
    User::new("alice", "Alice Liddell", Role::User, "wonderland").with_email("alice@example.org")
}

#[tokio::test]
async fn test_register_authenticate_fetch() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());

    users.add_user(&alice()).await.expect("add alice");

    let err = users.get_user("alice", None).await.expect_err("anonymous get");
    assert_eq!(remote_kind(err), ErrorKind::AuthenticationRequired);

    let token = auth
        .authenticate(&Credentials::new("alice@example.org", "wonderland"), None)
        .await
        .expect("authenticate");
    assert_eq!(token.user, "alice");
    assert_eq!(auth.cached_token(), Some(token.clone()));

    let fetched = users.get_user("alice", Some(&token)).await.expect("own record");
    assert_eq!(fetched.username, "alice");
    assert_eq!(fetched.full_name, "Alice Liddell");
    assert!(fetched.emails.contains("alice@example.org"));
    assert_eq!(fetched.password, None);

    assert!(auth.validate_token(&token).await.expect("validate"));
    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_user_is_rejected() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());

    users.add_user(&alice()).await.expect("first add");
    let err = users.add_user(&alice()).await.expect_err("second add");
    match err {
        RpcError::RemoteOperationFailed { kind, message } => {
            assert_eq!(kind, ErrorKind::DuplicateUser);
            assert!(message.contains("alice"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let clash = User::new("alice2", "Other", Role::User, "pw").with_email("alice@example.org");
    let err = users.add_user(&clash).await.expect_err("email clash");
    assert_eq!(remote_kind(err), ErrorKind::DuplicateUser);
    server.stop().await;
}

#[tokio::test]
async fn test_check_password() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    users.add_user(&alice()).await.expect("add");

    assert!(users
        .check_password(&Credentials::new("alice", "wonderland"))
        .await
        .expect("right password"));
    assert!(!users
        .check_password(&Credentials::new("alice", "looking-glass"))
        .await
        .expect("wrong password"));
    assert!(!users
        .check_password(&Credentials::new("nobody", "x"))
        .await
        .expect("unknown user"));
    server.stop().await;
}

#[tokio::test]
async fn test_bad_credentials() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());
    users.add_user(&alice()).await.expect("add");

    let err = auth
        .authenticate(&Credentials::new("alice", "nope"), None)
        .await
        .expect_err("wrong password");
    assert_eq!(remote_kind(err), ErrorKind::InvalidCredentials);

    let err = auth
        .authenticate(&Credentials::new("ghost", "nope"), None)
        .await
        .expect_err("unknown user");
    assert_eq!(remote_kind(err), ErrorKind::InvalidCredentials);
    assert_eq!(auth.cached_token(), None);
    server.stop().await;
}

#[tokio::test]
async fn test_non_admin_cannot_read_others() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());

    users.add_user(&alice()).await.expect("add alice");
    users
        .add_user(&User::new("bob", "Bob", Role::User, "builder"))
        .await
        .expect("add bob");

    let token = auth
        .authenticate(&Credentials::new("alice", "wonderland"), None)
        .await
        .expect("authenticate");

    let err = users.get_user("bob", Some(&token)).await.expect_err("bob");
    assert_eq!(remote_kind(err), ErrorKind::AuthorizationDenied);

    let err = users.get_user("nobody", Some(&token)).await.expect_err("nobody");
    assert_eq!(remote_kind(err), ErrorKind::AuthorizationDenied);
    server.stop().await;
}

#[tokio::test]
async fn test_bootstrap_admin_reads_everyone() {
    let server = common::spawn_server_with(AuthConfig {
        bootstrap_admin: Some(BootstrapAdmin {
            username: "root".into(),
            password: "toor".into(),
            full_name: "Administrator".into(),
            emails: vec!["root@example.org".into()],
        }),
        ..AuthConfig::default()
    })
    .await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());
    users.add_user(&alice()).await.expect("add");

    let token = auth
        .authenticate(&Credentials::new("root@example.org", "toor"), None)
        .await
        .expect("admin login");

    let fetched = users
        .get_user("alice@example.org", Some(&token))
        .await
        .expect("admin reads alice");
    assert_eq!(fetched.username, "alice");

    let err = users.get_user("ghost", Some(&token)).await.expect_err("ghost");
    assert_eq!(remote_kind(err), ErrorKind::UserNotFound);
    server.stop().await;
}

#[tokio::test]
async fn test_expired_token() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());
    users.add_user(&alice()).await.expect("add");

    let token = auth
        .authenticate(
            &Credentials::new("alice", "wonderland"),
            Some(Duration::from_millis(100)),
        )
        .await
        .expect("short token");
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!auth.validate_token(&token).await.expect("validate"));
    let err = users.get_user("alice", Some(&token)).await.expect_err("expired");
    assert_eq!(remote_kind(err), ErrorKind::AuthenticationRequired);
    server.stop().await;
}

#[tokio::test]
async fn test_forged_token_is_invalid() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());
    users.add_user(&alice()).await.expect("add");
    users
        .add_user(&User::new("mallory", "Mallory", Role::User, "m"))
        .await
        .expect("add mallory");

    let token = auth
        .authenticate(&Credentials::new("mallory", "m"), None)
        .await
        .expect("authenticate");

    let forged = Token {
        user: "alice".into(),
        ..token.clone()
    };
    assert!(!auth.validate_token(&forged).await.expect("validate forged"));
    let err = users.get_user("alice", Some(&forged)).await.expect_err("forged");
    assert_eq!(remote_kind(err), ErrorKind::AuthenticationRequired);

    let invented = Token {
        id: "0".repeat(32),
        ..token
    };
    assert!(!auth.validate_token(&invented).await.expect("validate invented"));
    server.stop().await;
}

#[tokio::test]
async fn test_raw_stub_unknown_operation() {
    let server = common::spawn_server().await;
    let stub = ClientStub::new(server.address.clone());

    let err = stub.rpc("drop_tables", vec![], None).await.expect_err("unknown");
    assert_eq!(remote_kind(err), ErrorKind::OperationNotFound);
    server.stop().await;
}

#[tokio::test]
async fn test_server_metrics_track_calls() {
    let server = common::spawn_server().await;
    let users = RemoteUserDirectory::connect(server.address.clone());
    let auth = RemoteAuthenticationService::connect(server.address.clone());

    users.add_user(&alice()).await.expect("add");
    let _ = auth
        .authenticate(&Credentials::new("alice", "wonderland"), None)
        .await
        .expect("ok");
    let _ = auth
        .authenticate(&Credentials::new("alice", "bad"), None)
        .await
        .expect_err("bad");

    let dispatcher = std::sync::Arc::clone(&server.dispatcher);
    server.stop().await;

    let snapshot = dispatcher.metrics().snapshot();
    assert_eq!(snapshot.requests_total, 3);
    assert_eq!(snapshot.requests_failed, 1);
    assert_eq!(snapshot.authentications_success, 1);
    assert_eq!(snapshot.authentications_failed, 1);
    assert_eq!(snapshot.connections_total, 3);
}
