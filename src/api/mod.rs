//! API Module
//!
//! Request and response types exchanged with callers and upstreams.

pub mod exchange;
pub mod request;

pub use exchange::{
    GatewayRequest, GatewayResponse, QUOTA_REMAINING_HEADER, ROUTED_MODEL_HEADER,
    UPSTREAM_HEADER, USER_ID_HEADER,
};
pub use request::{InferenceRequest, Message, MessageContent, OutboundPayload};
