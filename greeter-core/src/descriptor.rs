//! # Service Descriptor
//!
//! Static metadata of the `helloworld.Greeter` service: its fully-qualified name and
//! the [`Method`] descriptor of `SayHello` (call type and the marshallers of both
//! message types). The client stub derives the HTTP/2 path and the codec of every
//! call from it.
//!
//! [`FILE_DESCRIPTOR_SET`] is the encoded `FileDescriptorSet` of `helloworld.proto`, written
//! by the code generator next to the generated types. It is what the gRPC Server Reflection
//! service announces.
use crate::marshal::{Marshaller, MarshallerCodec};
use crate::pb::{HelloReply, HelloRequest};
use http::uri::{InvalidUri, PathAndQuery};
use prost::Message;
use prost_types::FileDescriptorSet;
use std::fmt;
use tonic::codegen::GrpcMethod;

/// Fully-qualified name of the service.
pub const SERVICE_NAME: &str = "helloworld.Greeter";

pub const SAY_HELLO: &str = "SayHello";

/// Encoded `FileDescriptorSet` of `helloworld.proto`.
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("generated/helloworld_descriptor.bin");

/// How many messages travel in each direction of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodType {
    Unary,
    ClientStreaming,
    ServerStreaming,
    DuplexStreaming,
}

impl MethodType {
    pub fn is_client_streaming(&self) -> bool {
        matches!(self, Self::ClientStreaming | Self::DuplexStreaming)
    }

    pub fn is_server_streaming(&self) -> bool {
        matches!(self, Self::ServerStreaming | Self::DuplexStreaming)
    }
}

/// Descriptor of a single RPC method.
pub struct Method<Req, Res> {
    kind: MethodType,
    service_name: &'static str,
    name: &'static str,
    path: PathAndQuery,
    request_marshaller: Marshaller<Req>,
    response_marshaller: Marshaller<Res>,
}

impl<Req, Res> Method<Req, Res> {
    /// Fails when the service or method name cannot appear in an HTTP/2 path.
    pub fn new(
        kind: MethodType,
        service_name: &'static str,
        name: &'static str,
        request_marshaller: Marshaller<Req>,
        response_marshaller: Marshaller<Res>,
    ) -> Result<Self, InvalidUri> {
        let path = PathAndQuery::try_from(format!("/{service_name}/{name}"))?;

        Ok(Self {
            kind,
            service_name,
            name,
            path,
            request_marshaller,
            response_marshaller,
        })
    }

    pub fn kind(&self) -> MethodType {
        self.kind
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request_marshaller(&self) -> &Marshaller<Req> {
        &self.request_marshaller
    }

    pub fn response_marshaller(&self) -> &Marshaller<Res> {
        &self.response_marshaller
    }

    /// `package.Service/Method`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.service_name, self.name)
    }

    /// The HTTP/2 path the call is routed on (`/package.Service/Method`).
    pub fn path(&self) -> PathAndQuery {
        self.path.clone()
    }

    pub fn codec(&self) -> MarshallerCodec<Req, Res> {
        MarshallerCodec::new(self.request_marshaller, self.response_marshaller)
    }

    /// Request extension identifying the method, read by tower layers and interceptors.
    pub fn grpc_method(&self) -> GrpcMethod<'static> {
        GrpcMethod::new(self.service_name, self.name)
    }
}

impl<Req, Res> Clone for Method<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            ..*self
        }
    }
}

impl<Req, Res> fmt::Debug for Method<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("kind", &self.kind)
            .field("service_name", &self.service_name)
            .field("name", &self.name)
            .finish()
    }
}

/// The `SayHello` unary method.
pub fn say_hello_method() -> Method<HelloRequest, HelloReply> {
    Method {
        kind: MethodType::Unary,
        service_name: SERVICE_NAME,
        name: SAY_HELLO,
        path: PathAndQuery::from_static("/helloworld.Greeter/SayHello"),
        request_marshaller: Marshaller::prost(),
        response_marshaller: Marshaller::prost(),
    }
}

/// Decodes [`FILE_DESCRIPTOR_SET`].
pub fn file_descriptor_set() -> Result<FileDescriptorSet, prost::DecodeError> {
    FileDescriptorSet::decode(FILE_DESCRIPTOR_SET)
}
