//! Panic boundary.
//!
//! [`RecoverMiddleware`] catches a panic raised anywhere further down the
//! chain, logs it at `error` level with the method, path and trace id, and
//! answers with:
//!
//! ```text
//! HTTP/1.1 500 Internal Server Error
//! Connection: close
//! Content-Type: application/json
//!
//! {"error":"internal server error","trace_id":"<id>"}
//! ```
//!
//! The trace id is read from the context after the panic, so an enricher
//! that ran before the failure still contributes its value; otherwise the
//! body carries `"unknown"`. Add this stage first so it covers every other
//! layer.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use futures_util::FutureExt;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use toolbox_core::{body, Envelope, Request, Response};
use toolbox_responder::response::INTERNAL_SERVER_ERROR_MESSAGE;
use toolbox_responder::JsonResponder;

/// Middleware that turns panics into a 500 envelope.
#[derive(Debug, Clone, Default)]
pub struct RecoverMiddleware {
    responder: JsonResponder,
}

impl RecoverMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `responder` to write the 500 envelope.
    #[must_use]
    pub fn with_responder(mut self, responder: JsonResponder) -> Self {
        self.responder = responder;
        self
    }

    fn panic_response(&self, trace_id: &str) -> Response {
        let envelope = Envelope::error(INTERNAL_SERVER_ERROR_MESSAGE).with("trace_id", trace_id);
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

        match self
            .responder
            .write_json(StatusCode::INTERNAL_SERVER_ERROR, &envelope, Some(headers))
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(trace_id = %trace_id, error = %err, "failed to write panic response");
                let mut response = http::Response::new(body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("close"));
                response
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Middleware for RecoverMiddleware {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_owned();

            match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
                Ok(response) => response,
                Err(payload) => {
                    let trace_id = ctx.trace_id();
                    tracing::error!(
                        trace_id = %trace_id,
                        method = %method,
                        path = %path,
                        error = %panic_message(payload.as_ref()),
                        "panic recovered"
                    );
                    self.panic_response(trace_id)
                }
            }
        })
    }
}
