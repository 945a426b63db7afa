//! # Greeter Core
//!
//! `greeter-core` is the binding layer of the `helloworld.Greeter` gRPC service: a single
//! unary method, `SayHello(HelloRequest) -> HelloReply`. Transport, framing and
//! serialization are all delegated to `tonic` and `prost`; this crate only wires the
//! typed surface on top of them.
//!
//! ## Key Components
//!
//! * **[`pb`]:** The message types and the server router, generated from
//!   `proto/helloworld.proto` by `tonic-prost-build`.
//! * **[`marshal`]:** Serialize/parse pairs and the `tonic` codec built from them.
//! * **[`descriptor`]:** The service name, the `SayHello` method descriptor and the
//!   protobuf `FileDescriptorSet` of the service.
//! * **[`client`]:** The async and blocking client stubs, with cancellation.
//! * **[`server`]:** `bind_service`, the reference [`server::HelloGreeter`] and [`server::serve`].
//! * **[`bench`]:** Round-trip latency measurement over the client stub.
//!
//! ## Feature Flags (Internal use only)
//!
//! * `gen-proto`: Enables the binary that regenerates [`pb`] from the proto file.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `tokio_util` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod bench;
pub mod client;
pub mod descriptor;
pub mod marshal;
pub mod server;

pub mod pb {
    include!("generated/helloworld.rs");
}

// Re-exports
pub use prost;
pub use tokio_util;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
