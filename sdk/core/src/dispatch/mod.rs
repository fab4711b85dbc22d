//! Handler table and dispatch
//!
//! Handlers are generic over their params type. Params arrive as a named
//! JSON object and are deserialized into whatever the handler declares, so
//! a handler that only needs `item_id` simply declares a struct with that
//! one field. Results are any `Serialize` value; `()` becomes `{}`.
//!
//! Dispatch never fails the connection: unknown methods answer `{}`, bad
//! params answer `INVALID_PARAMS`, and handler errors or panics answer
//! `INTERNAL_ERROR`.

pub mod requests;

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::context::PluginContext;
use crate::protocol::methods::{INTERNAL_ERROR, INVALID_PARAMS};
use crate::protocol::RpcError;

pub use requests::{
    ActionRequest, FormSubmitted, InitialRequest, SearchRequest, SliderChanged, SwitchToggled,
};

/// Future returned by a type-erased handler
pub type HandlerFuture = BoxFuture<'static, Result<Value, RpcError>>;

type Handler = Box<dyn Fn(PluginContext, Value) -> HandlerFuture + Send + Sync>;

/// Method name to handler, at most one handler per name
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("methods", &methods)
            .finish()
    }
}

impl HandlerTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler for `method`
    ///
    /// Replaces any handler already registered under the same name.
    pub fn on<T, R, F, Fut>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let method = method.into();
        let name = method.clone();

        let erased: Handler = Box::new(move |ctx, params| {
            let request = match serde_json::from_value::<T>(params) {
                Ok(request) => request,
                Err(e) => {
                    let err =
                        RpcError::new(INVALID_PARAMS, format!("Invalid params for '{name}': {e}"));
                    return future::ready(Err(err)).boxed();
                }
            };

            let fut = handler(ctx, request);
            async move {
                let output = fut
                    .await
                    .map_err(|e| RpcError::new(INTERNAL_ERROR, format!("{e:#}")))?;
                into_result(output)
            }
            .boxed()
        });

        if self.handlers.insert(method.clone(), erased).is_some() {
            warn!(method = %method, "Replacing previously registered handler");
        }
        self
    }

    /// Register a synchronous handler for `method`
    pub fn on_sync<T, R, F>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(PluginContext, T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.on(method, move |ctx, request| future::ready(handler(ctx, request)))
    }

    /// Whether a handler is registered for `method`
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `method` to completion
    ///
    /// `Ok` is the value for a success Response, `Err` the error object for
    /// a failure Response.
    pub async fn dispatch(
        &self,
        ctx: PluginContext,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let Some(handler) = self.handlers.get(method) else {
            debug!(method = %method, "No handler registered, answering empty result");
            return Ok(empty_result());
        };

        // Sync handlers run inside the call itself, so guard it as well as the future
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| handler(ctx, params))) {
            Ok(fut) => fut,
            Err(payload) => return Err(panicked(method, payload.as_ref())),
        };

        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(panicked(method, payload.as_ref())),
        }
    }
}

fn empty_result() -> Value {
    Value::Object(Map::new())
}

fn into_result<R: Serialize>(output: R) -> Result<Value, RpcError> {
    match serde_json::to_value(output) {
        Ok(Value::Null) => Ok(empty_result()),
        Ok(value) => Ok(value),
        Err(e) => Err(RpcError::new(
            INTERNAL_ERROR,
            format!("Handler result is not serializable: {e}"),
        )),
    }
}

fn panicked(method: &str, payload: &(dyn Any + Send)) -> RpcError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    error!(method = %method, panic = %detail, "Handler panicked");
    RpcError::new(INTERNAL_ERROR, format!("Handler panicked: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::context_pair;
    use crate::protocol::methods::{ACTION, SEARCH};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[tokio::test]
    async fn test_unregistered_method_answers_empty_object() {
        let (ctx, _peer) = context_pair();
        let table = HandlerTable::new();

        let result = table.dispatch(ctx, "slider_changed", json!({"id": "v"})).await;
        assert_eq!(result, Ok(json!({})));
    }

    #[tokio::test]
    async fn test_async_handler_receives_typed_params() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on(SEARCH, |_ctx, req: SearchRequest| async move {
            anyhow::Ok(json!({"echo": req.query}))
        });

        let result = table
            .dispatch(ctx, SEARCH, json!({"query": "fire", "context": null}))
            .await;
        assert_eq!(result, Ok(json!({"echo": "fire"})));
    }

    #[tokio::test]
    async fn test_prefix_declared_handler_ignores_extra_args() {
        #[derive(Deserialize)]
        struct ItemOnly {
            #[serde(alias = "itemId")]
            item_id: String,
        }

        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on_sync(ACTION, |_ctx, req: ItemOnly| Ok(json!({"item": req.item_id})));

        let result = table
            .dispatch(
                ctx,
                ACTION,
                json!({"itemId": "calc", "action": "copy", "context": "x", "source": "ambient"}),
            )
            .await;
        assert_eq!(result, Ok(json!({"item": "calc"})));
    }

    #[tokio::test]
    async fn test_unit_result_normalizes_to_empty_object() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on_sync("initial", |_ctx, _req: InitialRequest| Ok(()));

        assert_eq!(table.dispatch(ctx, "initial", json!({})).await, Ok(json!({})));
    }

    #[tokio::test]
    async fn test_bad_params_answer_invalid_params() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on_sync("slider_changed", |_ctx, _req: SliderChanged| Ok(()));

        let err = table
            .dispatch(ctx, "slider_changed", json!({"value": "loud"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, Some(INVALID_PARAMS));
        assert!(err.message.contains("slider_changed"));
    }

    #[tokio::test]
    async fn test_handler_error_answers_internal_error() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on(SEARCH, |_ctx, _req: SearchRequest| async move {
            Err::<(), _>(anyhow::anyhow!("index unavailable"))
        });

        let err = table.dispatch(ctx, SEARCH, json!({})).await.unwrap_err();
        assert_eq!(err, RpcError::new(INTERNAL_ERROR, "index unavailable"));
    }

    #[tokio::test]
    async fn test_panics_are_contained() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table.on(SEARCH, |_ctx, _req: SearchRequest| async move {
            if true {
                panic!("async boom");
            }
            anyhow::Ok(())
        });
        table.on_sync::<InitialRequest, (), _>("initial", |_ctx, _req| panic!("sync boom"));

        let err = table.dispatch(ctx.clone(), SEARCH, json!({})).await.unwrap_err();
        assert_eq!(err.code, Some(INTERNAL_ERROR));
        assert!(err.message.contains("async boom"));

        let err = table.dispatch(ctx, "initial", json!({})).await.unwrap_err();
        assert!(err.message.contains("sync boom"));
    }

    #[tokio::test]
    async fn test_second_registration_replaces_first() {
        let (ctx, _peer) = context_pair();
        let mut table = HandlerTable::new();
        table
            .on_sync(SEARCH, |_ctx, _req: SearchRequest| Ok("first"))
            .on_sync(SEARCH, |_ctx, _req: SearchRequest| Ok("second"));

        assert_eq!(table.len(), 1);
        assert!(table.contains(SEARCH));
        assert_eq!(table.dispatch(ctx, SEARCH, json!({})).await, Ok(json!("second")));
    }
}
