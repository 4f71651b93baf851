//! Lapse gRPC Protocol Definitions
//!
//! Generated server and client code for the Lapse expiring-store service.

/// Generated protobuf/gRPC code
pub mod lapse {
    tonic::include_proto!("lapse");
}

pub use lapse::*;
