//! Registration handshake
//!
//! Runs before any concurrent path starts, so it reads frames directly
//! from the connection instead of going through the dispatch queue.

use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::context::PluginContext;
use crate::error::PluginError;
use crate::manifest::{Manifest, RegisterParams};
use crate::protocol::methods::REGISTER;
use crate::protocol::{Envelope, Message, RequestId, RpcError};
use crate::transport::FrameReader;

/// Send `register` and wait for its Response
///
/// Any failure is returned as `PluginError::Registration`. With a timeout
/// of `None` the handshake waits indefinitely.
pub async fn register<R>(
    reader: &mut FrameReader<R>,
    ctx: &PluginContext,
    manifest: &Manifest,
    timeout: Option<Duration>,
) -> Result<Value, PluginError>
where
    R: AsyncRead + Unpin,
{
    let handshake = handshake(reader, ctx, manifest);
    let shutdown = ctx.shutdown_token();

    let outcome = tokio::select! {
        outcome = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, handshake)
                    .await
                    .unwrap_or_else(|_| Err(format!("no response within {}ms", limit.as_millis()))),
                None => handshake.await,
            }
        } => outcome,
        () = shutdown.cancelled() => Err("interrupted by shutdown".to_string()),
    };

    match outcome {
        Ok(result) => {
            info!(plugin_id = %manifest.id, "Registered with host");
            Ok(result)
        }
        Err(reason) => {
            warn!(plugin_id = %manifest.id, reason = %reason, "Registration failed");
            Err(PluginError::Registration(reason))
        }
    }
}

async fn handshake<R>(
    reader: &mut FrameReader<R>,
    ctx: &PluginContext,
    manifest: &Manifest,
) -> Result<Value, String>
where
    R: AsyncRead + Unpin,
{
    let params = serde_json::to_value(RegisterParams::plugin(manifest))
        .map_err(|e| format!("cannot encode manifest: {e}"))?;
    let (id, waiter) = ctx.pending().register().map_err(|e| e.to_string())?;
    let _guard = ctx.pending().guard(id);

    ctx.send(&Envelope::request(id, REGISTER, params))
        .await
        .map_err(|e| format!("cannot send register request: {e}"))?;
    debug!(id = id, "Sent register request");

    // Route through the table so the id is retired like any other request
    let outcome = await_response(reader, id).await?;
    ctx.pending().resolve(id, outcome);
    let outcome = waiter
        .await
        .map_err(|_| "register waiter dropped".to_string())?;

    let result = outcome.map_err(|e| format!("host rejected registration: {e}"))?;
    check_accepted(&result)?;
    Ok(result)
}

/// Read frames until the Response for `id` arrives
async fn await_response<R>(
    reader: &mut FrameReader<R>,
    id: RequestId,
) -> Result<Result<Value, RpcError>, String>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match reader.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err("connection closed during handshake".to_string()),
            Err(e) => return Err(format!("transport error during handshake: {e}")),
        };

        match Message::parse(&frame) {
            Ok(Message::Response {
                id: response_id,
                outcome,
            }) if response_id == id => return Ok(outcome),
            Ok(other) => {
                debug!(method = ?other.method(), "Discarding message received before registration completed");
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed frame during handshake");
            }
        }
    }
}

/// A success Response may still carry `ok: false`
fn check_accepted(result: &Value) -> Result<(), String> {
    if result.get("ok").and_then(Value::as_bool) == Some(false) {
        let reason = result
            .get("error")
            .or_else(|| result.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given");
        return Err(format!("host rejected registration: {reason}"));
    }
    Ok(())
}
