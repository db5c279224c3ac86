//! Loopback walkthrough: one client serves two functions, a second client
//! registers with it and invokes them.
//!
//! Run with: cargo run -p meridian-echo-demo

use std::time::Duration;

use meridian_client::{Client, ClientConfig, FunctionDescriptor, InvokeOptions};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // The serving side: register two functions and serve them.
    let server = Client::new(ClientConfig {
        bind_address: "127.0.0.1:0".to_owned(),
        service_id: "echo-server".to_owned(),
        game_id: "demo-game".to_owned(),
        ..ClientConfig::default()
    });

    server.register_async_fn(
        FunctionDescriptor::new("echo", "util").with_description("Echoes the payload back"),
        |ctx, payload| async move {
            println!("  [server] call {} for {}", ctx.call_id(), ctx.function_id());
            Ok(payload)
        },
    )?;
    server.register_sync_fn(
        FunctionDescriptor::new("shout", "util"),
        |_ctx, payload| Ok(payload.to_uppercase()),
    )?;

    let cancel = CancellationToken::new();
    let serve_handle = {
        let server = server.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { server.serve(cancel).await })
    };

    // Wait for the ephemeral port.
    let addr = loop {
        if let Some(addr) = server.serving_addr().await {
            break addr.to_string();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    println!("serving on {addr}");

    // The calling side: connect, register, invoke.
    let caller = Client::new(ClientConfig {
        agent_address: addr,
        service_id: "echo-caller".to_owned(),
        game_id: "demo-game".to_owned(),
        ..ClientConfig::default()
    });
    caller.connect().await?;

    let echoed = caller
        .invoke("util.echo", "{\"hello\":\"meridian\"}", InvokeOptions::default())
        .await?;
    println!("util.echo  -> {echoed}");

    let shouted = caller
        .invoke("util.shout", "quiet please", InvokeOptions::default())
        .await?;
    println!("util.shout -> {shouted}");

    match caller
        .invoke("util.missing", "{}", InvokeOptions::default())
        .await
    {
        Ok(_) => println!("util.missing unexpectedly succeeded"),
        Err(e) => println!("util.missing -> {e}"),
    }

    caller.dispose().await?;
    cancel.cancel();
    serve_handle.await??;
    server.dispose().await?;
    Ok(())
}
