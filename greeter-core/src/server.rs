//! # Greeter Server Binding
//!
//! Registers an implementation of the generated [`Greeter`] trait against the service
//! descriptor, so that `tonic`'s router dispatches `/helloworld.Greeter/SayHello` to it.
//!
//! The module also ships [`HelloGreeter`], the reference implementation, and [`serve`],
//! which runs the bound service on a TCP listener until a shutdown signal resolves.
use crate::descriptor::FILE_DESCRIPTOR_SET;
use crate::pb::greeter_server::{Greeter, GreeterServer};
use crate::pb::{HelloReply, HelloRequest};
use std::future::Future;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status, transport::Server};
use tracing::Instrument;

/// Errors that can occur while running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to build the reflection service: '{0}'")]
    Reflection(#[from] tonic_reflection::server::Error),
    #[error("Server transport failure: '{0}'")]
    Transport(#[from] tonic::transport::Error),
}

/// Options of [`serve`].
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Also expose the gRPC Server Reflection service (`grpc.reflection.v1`).
    pub reflection: bool,
}

/// Creates the service definition that can be registered with a server.
pub fn bind_service<T: Greeter>(service: T) -> GreeterServer<T> {
    GreeterServer::new(service)
}

/// Replies to `SayHello` with the configured prefix followed by the caller's name.
#[derive(Debug, Clone)]
pub struct HelloGreeter {
    prefix: String,
}

impl HelloGreeter {
    pub const DEFAULT_PREFIX: &'static str = "Hello ";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for HelloGreeter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

#[tonic::async_trait]
impl Greeter for HelloGreeter {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        tracing::info!(remote_addr = ?request.remote_addr(), "got a SayHello request");

        let name = request.into_inner().name;

        Ok(Response::new(HelloReply {
            message: format!("{}{}", self.prefix, name),
        }))
    }
}

/// Serves `greeter` on `listener` until `shutdown` resolves.
///
/// Each setup phase runs in its own `info` span (`build_reflection`, `bind_service`,
/// `build_router`) and the accept loop in `serve`, so a subscriber recording span
/// close events reports how long each of them took.
///
/// # Returns
///
/// * `Ok(())` - The server stopped after the shutdown signal.
/// * `Err(ServeError)` - The reflection service could not be built or the transport failed.
pub async fn serve<T, F>(
    listener: TcpListener,
    greeter: T,
    options: &ServeOptions,
    shutdown: F,
) -> Result<(), ServeError>
where
    T: Greeter,
    F: Future<Output = ()> + Send,
{
    let reflection = tracing::info_span!("build_reflection", enabled = options.reflection)
        .in_scope(|| -> Result<_, ServeError> {
            if !options.reflection {
                return Ok(None);
            }

            let service = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()?;
            Ok(Some(service))
        })?;

    let service = tracing::info_span!("bind_service").in_scope(|| bind_service(greeter));

    let router = tracing::info_span!("build_router").in_scope(|| {
        Server::builder()
            .add_service(service)
            .add_optional_service(reflection)
    });

    let span = match listener.local_addr() {
        Ok(addr) => {
            tracing::info!(%addr, reflection = options.reflection, "server listening");
            tracing::info_span!("serve", %addr)
        }
        Err(_) => tracing::info_span!("serve"),
    };

    router
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .instrument(span)
        .await?;

    tracing::info!("server stopped");

    Ok(())
}
