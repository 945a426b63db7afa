//! # Greeter Client Stub
//!
//! This module wraps `tonic`'s generic unary call primitive (`tonic::client::Grpc::unary`)
//! into a typed `SayHello` call. It holds no logic of its own: the request is encoded with
//! the marshallers of [`say_hello_method`], sent on the method path, and the reply (or the
//! `tonic::Status` raised by the runtime) is returned untouched.
//!
//! Two stubs are provided:
//!
//! * **[`GreeterClient`]**: async, generic over any `GrpcService` so it can run on a
//!   `Channel` or directly on an in-process `GreeterServer`.
//! * **[`BlockingGreeterClient`]**: owns a tokio runtime and exposes the same call as a
//!   blocking function.
//!
//! Both forward a [`CancellationToken`]. When it fires the in-flight call is dropped and
//! the caller gets `Status::cancelled`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use greeter_core::client::GreeterClient;
//! use greeter_core::pb::HelloRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = GreeterClient::connect("http://localhost:50051").await?;
//!
//! let request = HelloRequest { name: "world".to_string() };
//! let reply = client.say_hello(request, &CancellationToken::new()).await?;
//!
//! println!("{}", reply.into_inner().message);
//! # Ok(())
//! # }
//! ```
use crate::BoxError;
use crate::descriptor::say_hello_method;
use crate::pb::{HelloReply, HelloRequest};
use http_body::Body as HttpBody;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tonic::{
    IntoRequest, Request, Response, Status,
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataMap, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::{Channel, Endpoint},
};

/// Errors raised while building a stub from a [`StubConfig`].
#[derive(Debug, thiserror::Error)]
pub enum StubConfigError {
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// Errors that can occur when connecting a stub to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
    #[error(transparent)]
    Config(#[from] StubConfigError),
    #[error("Failed to start the client runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
}

/// Per-stub settings applied to every call.
#[derive(Debug, Clone, Default)]
pub struct StubConfig {
    /// Deadline of each call, sent to the server as `grpc-timeout`.
    pub timeout: Option<Duration>,
    /// Upper bound on establishing the connection. Only used by `connect*`.
    pub connect_timeout: Option<Duration>,
    /// Static metadata (headers) attached to every call.
    pub headers: Vec<(String, String)>,
}

impl StubConfig {
    fn metadata(&self) -> Result<MetadataMap, StubConfigError> {
        let mut metadata = MetadataMap::new();

        for (k, v) in &self.headers {
            let key = MetadataKey::from_str(k).map_err(|source| {
                StubConfigError::InvalidMetadataKey {
                    key: k.clone(),
                    source,
                }
            })?;
            let val = MetadataValue::from_str(v).map_err(|source| {
                StubConfigError::InvalidMetadataValue {
                    key: k.clone(),
                    source,
                }
            })?;
            metadata.insert(key, val);
        }

        Ok(metadata)
    }
}

/// Async client stub for `helloworld.Greeter`.
#[derive(Debug, Clone)]
pub struct GreeterClient<S = Channel> {
    inner: tonic::client::Grpc<S>,
    timeout: Option<Duration>,
    metadata: MetadataMap,
}

impl GreeterClient<Channel> {
    /// Connects to a gRPC server with the default [`StubConfig`].
    ///
    /// # Arguments
    ///
    /// * `addr` - The server URI (e.g., `http://localhost:50051`).
    pub async fn connect(addr: &str) -> Result<Self, ClientConnectError> {
        Self::connect_with_config(addr, &StubConfig::default()).await
    }

    /// Connects to a gRPC server and applies `config` to every call of the stub.
    ///
    /// # Returns
    ///
    /// * `Ok(GreeterClient)` - The connected stub.
    /// * `Err(ClientConnectError)` - If the URL or the config is invalid, or the connection fails.
    pub async fn connect_with_config(
        addr: &str,
        config: &StubConfig,
    ) -> Result<Self, ClientConnectError> {
        let mut endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| ClientConnectError::InvalidUrl(addr.to_string(), e))?;

        if let Some(connect_timeout) = config.connect_timeout {
            endpoint = endpoint.connect_timeout(connect_timeout);
        }

        tracing::debug!(addr, "connecting to greeter server");

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(addr.to_string(), e))?;

        Ok(Self::with_config(channel, config)?)
    }
}

impl<S> GreeterClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: tonic::client::Grpc::new(service),
            timeout: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_config(service: S, config: &StubConfig) -> Result<Self, StubConfigError> {
        Ok(Self {
            inner: tonic::client::Grpc::new(service),
            timeout: config.timeout,
            metadata: config.metadata()?,
        })
    }

    /// Performs the `SayHello` unary call.
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - The server's reply.
    /// * `Err(Status)` - Whatever the runtime or the server raised, or `Cancelled`
    ///   if `token` fired before the reply arrived.
    pub async fn say_hello(
        &mut self,
        request: impl IntoRequest<HelloRequest>,
        token: &CancellationToken,
    ) -> Result<Response<HelloReply>, Status> {
        if token.is_cancelled() {
            return Err(cancelled());
        }

        let request = self.prepare(request.into_request());

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(cancelled()),
            res = self.unary(request) => res,
        }
    }

    async fn unary(&mut self, request: Request<HelloRequest>) -> Result<Response<HelloReply>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("Service was not ready: {}", e.into())))?;

        let method = say_hello_method();

        self.inner.unary(request, method.path(), method.codec()).await
    }

    fn prepare(&self, mut request: Request<HelloRequest>) -> Request<HelloRequest> {
        for entry in self.metadata.iter() {
            if let tonic::metadata::KeyAndValueRef::Ascii(key, value) = entry {
                request.metadata_mut().insert(key.clone(), value.clone());
            }
        }

        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }

        request
            .extensions_mut()
            .insert(say_hello_method().grpc_method());

        request
    }
}

/// Creates a new async stub on an existing channel.
pub fn new_stub(channel: Channel) -> GreeterClient<Channel> {
    GreeterClient::new(channel)
}

/// Creates a new async stub on an existing channel with a custom [`StubConfig`].
pub fn new_stub_with_config(
    channel: Channel,
    config: &StubConfig,
) -> Result<GreeterClient<Channel>, StubConfigError> {
    GreeterClient::with_config(channel, config)
}

/// Blocking client stub for `helloworld.Greeter`.
///
/// Drives an async [`GreeterClient`] on its own current-thread runtime, so it must not
/// be called from inside an async context.
#[derive(Debug)]
pub struct BlockingGreeterClient {
    client: GreeterClient<Channel>,
    rt: Runtime,
}

impl BlockingGreeterClient {
    pub fn connect(addr: &str) -> Result<Self, ClientConnectError> {
        Self::connect_with_config(addr, &StubConfig::default())
    }

    pub fn connect_with_config(
        addr: &str,
        config: &StubConfig,
    ) -> Result<Self, ClientConnectError> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientConnectError::RuntimeInit)?;

        let client = rt.block_on(GreeterClient::connect_with_config(addr, config))?;

        Ok(Self { client, rt })
    }

    /// Blocking version of [`GreeterClient::say_hello`].
    pub fn say_hello(
        &mut self,
        request: impl IntoRequest<HelloRequest>,
        token: &CancellationToken,
    ) -> Result<Response<HelloReply>, Status> {
        self.rt.block_on(self.client.say_hello(request, token))
    }
}

fn cancelled() -> Status {
    Status::cancelled("Call cancelled by the client")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_rejects_invalid_header_key() {
        let config = StubConfig {
            headers: vec![("bad key".to_string(), "value".to_string())],
            ..Default::default()
        };

        let err = config.metadata().unwrap_err();

        assert!(matches!(err, StubConfigError::InvalidMetadataKey { key, .. } if key == "bad key"));
    }

    #[test]
    fn config_rejects_invalid_header_value() {
        let config = StubConfig {
            headers: vec![("x-trace".to_string(), "line\nbreak".to_string())],
            ..Default::default()
        };

        let err = config.metadata().unwrap_err();

        assert!(matches!(err, StubConfigError::InvalidMetadataValue { key, .. } if key == "x-trace"));
    }

    #[test]
    fn config_builds_metadata() {
        let config = StubConfig {
            headers: vec![
                ("x-user".to_string(), "alice".to_string()),
                ("x-tenant".to_string(), "acme".to_string()),
            ],
            ..Default::default()
        };

        let metadata = config.metadata().unwrap();

        assert_eq!(metadata.get("x-user").unwrap(), "alice");
        assert_eq!(metadata.get("x-tenant").unwrap(), "acme");
    }

    #[tokio::test]
    async fn connect_rejects_invalid_url() {
        let err = GreeterClient::connect("not a url").await.unwrap_err();

        assert!(matches!(err, ClientConnectError::InvalidUrl(url, _) if url == "not a url"));
    }
}
