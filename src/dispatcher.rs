//! Request Dispatcher
//!
//! Runs one inbound request through the pipeline:
//! authenticate -> parse -> consume quota -> route -> call upstream -> relay.
//!
//! Every stage produces a new immutable value; rejections short-circuit and
//! nothing already consumed is rolled back. Dropping the future returned by
//! [`Dispatcher::handle`] drops the in-flight upstream call with it.

use crate::api::{
    GatewayRequest, GatewayResponse, InferenceRequest, OutboundPayload, QUOTA_REMAINING_HEADER,
    ROUTED_MODEL_HEADER, UPSTREAM_HEADER,
};
use crate::auth::{AuthGate, CallerContext};
use crate::client::{UpstreamClient, UpstreamError, UpstreamReply};
use crate::config::PayloadDefaults;
use crate::error::{GatewayError, Result};
use crate::quota::{Allowance, QuotaGuard};
use crate::router::{prompt_length, RoutingDecision, RoutingEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest upstream body excerpt kept in error details
const ERROR_BODY_EXCERPT: usize = 500;

/// Everything known about a request once it has been admitted and routed
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: InferenceRequest,
    pub prompt: String,
    pub caller: CallerContext,
    pub allowance: Allowance,
    pub decision: RoutingDecision,
}

pub struct Dispatcher {
    auth: AuthGate,
    quota: QuotaGuard,
    router: RoutingEngine,
    upstream: Arc<dyn UpstreamClient>,
    defaults: PayloadDefaults,
    upstream_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        auth: AuthGate,
        quota: QuotaGuard,
        router: RoutingEngine,
        upstream: Arc<dyn UpstreamClient>,
        defaults: PayloadDefaults,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            auth,
            quota,
            router,
            upstream,
            defaults,
            upstream_timeout,
        }
    }

    pub fn router(&self) -> &RoutingEngine {
        &self.router
    }

    /// Handle one request end to end. Never fails: errors become responses.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        match self.dispatch(&request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_client_error() {
                    debug!(error = %err, status = err.status(), "request rejected");
                } else if !matches!(err, GatewayError::RoutingConfig(_)) {
                    // Routing defects are already reported by the engine
                    error!(error = %err, "request failed");
                }
                GatewayResponse::from_error(&err)
            }
        }
    }

    async fn dispatch(&self, raw: &GatewayRequest) -> Result<GatewayResponse> {
        let context = self.admit_and_route(raw).await?;
        let payload = OutboundPayload::build(
            &context.decision.model,
            &context.request,
            &context.prompt,
            &self.defaults,
        );

        let reply = self.call_upstream(&context.decision, &payload).await?;
        Ok(Self::relay(&context, reply))
    }

    /// Run every stage up to and including the routing decision
    pub async fn admit_and_route(&self, raw: &GatewayRequest) -> Result<RequestContext> {
        let caller = self
            .auth
            .authenticate(raw.authorization()?, raw.user_id_header())
            .await?;

        // Malformed bodies are rejected before any quota is consumed
        let request = InferenceRequest::parse(&raw.body)?;
        let prompt = request.extract_prompt();

        let allowance = self.quota.check_and_consume(&caller).await?;

        debug!(
            prompt_length = prompt_length(&prompt),
            tier = %caller.tier,
            "routing request"
        );

        let decision = self
            .router
            .select(&prompt, caller.tier, request.explicit_model())?;

        info!(model = %decision.model, upstream = %decision.upstream, tier = %caller.tier, "routing decision");

        Ok(RequestContext {
            request,
            prompt,
            caller,
            allowance,
            decision,
        })
    }

    async fn call_upstream(
        &self,
        decision: &RoutingDecision,
        payload: &OutboundPayload,
    ) -> Result<UpstreamReply> {
        let upstream = decision.upstream.clone();

        let reply = tokio::time::timeout(
            self.upstream_timeout,
            self.upstream.invoke(&decision.upstream, payload),
        )
        .await
        .map_err(|_| GatewayError::UpstreamTimeout {
            upstream: upstream.clone(),
            timeout: self.upstream_timeout,
        })?
        .map_err(|e| match e {
            UpstreamError::UnknownUpstream(name) => {
                error!(target: "modelgate::config_defect", upstream = %name, "routed to an upstream the client does not know");
                GatewayError::RoutingConfig(format!("upstream '{}' is not configured", name))
            }
            UpstreamError::Timeout(_) => GatewayError::UpstreamTimeout {
                upstream: upstream.clone(),
                timeout: self.upstream_timeout,
            },
            UpstreamError::Transport(cause) => GatewayError::UpstreamTransport {
                upstream: upstream.clone(),
                cause,
            },
        })?;

        if !reply.is_success() {
            warn!(upstream = %upstream, status = reply.status, "upstream returned an error status");
            let excerpt: String = reply.body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(GatewayError::UpstreamTransport {
                upstream,
                cause: format!("status {}: {}", reply.status, excerpt),
            });
        }

        Ok(reply)
    }

    fn relay(context: &RequestContext, reply: UpstreamReply) -> GatewayResponse {
        let mut response = GatewayResponse::json(reply.status, reply.body);
        response.annotate(ROUTED_MODEL_HEADER, &context.decision.model);
        response.annotate(UPSTREAM_HEADER, &context.decision.upstream);
        if let Some(remaining) = context.allowance.remaining() {
            response.annotate(QUOTA_REMAINING_HEADER, &remaining.to_string());
        }
        response
    }
}
