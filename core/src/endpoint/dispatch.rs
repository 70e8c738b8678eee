//! Verb resolution and reply normalization.
//!
//! The dispatcher resolves the request verb against the endpoint's handler
//! table (HEAD aliases GET), invokes the composed handler, and normalizes
//! its [`Reply`] into the canonical response. Recoverable request
//! conditions are mapped to error envelopes at this boundary; a verb with
//! no bound handler is an [`EngineFault`] carried on the `Err` channel,
//! never an envelope.

use super::{EndpointType, Handler, Reply, Request, Response};
use crate::error::{EngineFault, JsonApiError};
use http::Method;
use std::future::Future;
use std::sync::Arc;

impl EndpointType {
    /// Dispatch one request through the bound verb handler.
    ///
    /// # Errors
    ///
    /// [`EngineFault::UnimplementedMethod`] when the verb has no bound
    /// handler, and any fault escalated by the handler itself. Faults are
    /// configuration defects: the hosting layer translates them into a
    /// 500-class response, the engine never does.
    pub async fn dispatch(self: Arc<Self>, request: Request) -> Result<Response, EngineFault> {
        let lookup = if request.method == Method::HEAD {
            Method::GET
        } else {
            request.method.clone()
        };
        let handler = self.handlers.get(&lookup).cloned().ok_or_else(|| {
            EngineFault::UnimplementedMethod {
                endpoint: self.name.clone(),
                method: request.method.clone(),
            }
        })?;

        tracing::debug!(endpoint = %self.name, method = %request.method, "dispatching request");
        let reply = handler(self, request).await?;
        Ok(reply.into_response())
    }
}

/// Errors a base handler can raise.
///
/// Request conditions become envelopes; faults abort the request path.
pub(crate) enum HandlerError {
    /// Recoverable condition, mapped to an envelope at the boundary.
    Request(JsonApiError),
    /// Non-recoverable defect, escalated to the host.
    Fault(EngineFault),
}

impl From<JsonApiError> for HandlerError {
    fn from(err: JsonApiError) -> Self {
        Self::Request(err)
    }
}

impl From<EngineFault> for HandlerError {
    fn from(fault: EngineFault) -> Self {
        Self::Fault(fault)
    }
}

/// Lift a base handler into a composable [`Handler`], catching request
/// conditions and converting them into error envelopes.
pub(crate) fn adapt<F, Fut>(handler: F) -> Handler
where
    F: Fn(Arc<EndpointType>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    Arc::new(move |endpoint, request| {
        let future = handler(endpoint, request);
        Box::pin(async move {
            match future.await {
                Ok(reply) => Ok(reply),
                Err(HandlerError::Request(err)) => {
                    tracing::debug!(error = %err, "request condition mapped to error envelope");
                    Ok(Reply::DocumentWithStatus(err.document(), err.status()))
                }
                Err(HandlerError::Fault(fault)) => Err(fault),
            }
        })
    })
}

/// The replacement handler for a disabled verb: always a 405 envelope,
/// regardless of runtime arguments.
pub(crate) fn not_allowed() -> Handler {
    adapt(|_endpoint, _request| async {
        Err(HandlerError::Request(JsonApiError::method_not_allowed()))
    })
}
