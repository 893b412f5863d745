//! Client for publishing events to an Event Gateway.

pub mod client;

pub use client::{EmitRequest, EventGateway, GatewayConfig, SdkError};
