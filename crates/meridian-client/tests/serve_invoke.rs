//! End-to-end serve + invoke over loopback TCP: one client serves its
//! registry, a second client connects to it and invokes.

#![allow(clippy::expect_used)]

use std::time::Duration;

use meridian_client::{Client, ClientConfig, ClientError, FunctionDescriptor};
use meridian_proto::{ErrorCode, InvokeOptions};
use tokio_util::sync::CancellationToken;

async fn start_server(client: &Client, cancel: &CancellationToken) -> String {
    let serve_client = client.clone();
    let serve_cancel = cancel.clone();
    tokio::spawn(async move {
        serve_client.serve(serve_cancel).await.expect("serve");
    });

    // Wait for the listener to come up on its ephemeral port.
    for _ in 0..100 {
        if let Some(addr) = client.serving_addr().await {
            return addr.to_string();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("serve loop never bound");
}

fn server_config() -> ClientConfig {
    ClientConfig {
        bind_address: "127.0.0.1:0".to_owned(),
        service_id: "svc-server".to_owned(),
        game_id: "game-1".to_owned(),
        environment: "test".to_owned(),
        ..ClientConfig::default()
    }
}

fn caller_config(agent_address: String) -> ClientConfig {
    ClientConfig {
        agent_address,
        service_id: "svc-caller".to_owned(),
        game_id: "game-1".to_owned(),
        environment: "test".to_owned(),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn invoke_reaches_the_registered_handler() {
    let server = Client::new(server_config());
    server
        .register_async_fn(
            FunctionDescriptor::new("echo", "util"),
            |ctx, payload| async move {
                assert!(!ctx.call_id().is_empty());
                Ok(payload)
            },
        )
        .expect("register");

    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    let response = caller
        .invoke("util.echo", "{\"n\":1}", InvokeOptions::default())
        .await
        .expect("invoke");
    assert_eq!(response, "{\"n\":1}");

    caller.dispose().await.expect("dispose");
    cancel.cancel();
}

#[tokio::test]
async fn context_carries_caller_identity() {
    let server = Client::new(server_config());
    server
        .register_async_fn(
            FunctionDescriptor::new("whoami", "util"),
            |ctx, _payload| async move {
                Ok(format!(
                    "{}|{}|{}",
                    ctx.user_id().unwrap_or("-"),
                    ctx.idempotency_key().unwrap_or("-"),
                    ctx.caller_service_id().unwrap_or("-"),
                ))
            },
        )
        .expect("register");

    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    let options = InvokeOptions::default()
        .with_user_id("u-42")
        .with_idempotency_key("idem-9");
    let response = caller
        .invoke("util.whoami", "{}", options)
        .await
        .expect("invoke");
    assert_eq!(response, "u-42|idem-9|svc-caller");

    cancel.cancel();
}

#[tokio::test]
async fn unknown_function_yields_a_structured_error() {
    let server = Client::new(server_config());
    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    let err = caller
        .invoke("util.missing", "{}", InvokeOptions::default())
        .await
        .expect_err("missing function");
    match err {
        ClientError::Remote { code, message } => {
            assert_eq!(code, ErrorCode::FunctionNotFound);
            assert!(message.contains("util.missing"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    cancel.cancel();
}

#[tokio::test]
async fn throwing_handler_answers_and_the_loop_survives() {
    let server = Client::new(server_config());
    server
        .register_sync_fn(FunctionDescriptor::new("boom", "util"), |_, _| {
            panic!("invalid operation")
        })
        .expect("register boom");
    server
        .register_sync_fn(FunctionDescriptor::new("ok", "util"), |_, payload| {
            Ok(payload.to_owned())
        })
        .expect("register ok");

    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    // The panic is captured and surfaces as a well-formed failure reply.
    let err = caller
        .invoke("util.boom", "{}", InvokeOptions::default())
        .await
        .expect_err("panicking handler");
    match err {
        ClientError::Remote { code, message } => {
            assert_eq!(code, ErrorCode::FunctionFailed);
            assert!(message.contains("invalid operation"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    // The dispatcher is still listening and serves the next call.
    let response = caller
        .invoke("util.ok", "still alive", InvokeOptions::default())
        .await
        .expect("call after panic");
    assert_eq!(response, "still alive");

    cancel.cancel();
}

#[tokio::test]
async fn reregistration_routes_to_the_new_handler() {
    let server = Client::new(server_config());
    server
        .register_sync_fn(FunctionDescriptor::new("v", "util"), |_, _| {
            Ok("first".to_owned())
        })
        .expect("register first");
    server
        .register_sync_fn(FunctionDescriptor::new("v", "util"), |_, _| {
            Ok("second".to_owned())
        })
        .expect("register second");

    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    let response = caller
        .invoke("util.v", "{}", InvokeOptions::default())
        .await
        .expect("invoke");
    assert_eq!(response, "second");

    cancel.cancel();
}

#[tokio::test]
async fn disabled_function_is_not_served() {
    let server = Client::new(server_config());
    server
        .register_sync_fn(
            FunctionDescriptor::new("hidden", "util").disabled(),
            |_, _| Ok(String::new()),
        )
        .expect("register");

    let cancel = CancellationToken::new();
    let addr = start_server(&server, &cancel).await;

    let caller = Client::new(caller_config(addr));
    caller.connect().await.expect("connect");

    let err = caller
        .invoke("util.hidden", "{}", InvokeOptions::default())
        .await
        .expect_err("disabled function");
    assert!(matches!(
        err,
        ClientError::Remote {
            code: ErrorCode::FunctionNotFound,
            ..
        }
    ));

    cancel.cancel();
}
