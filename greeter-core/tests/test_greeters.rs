#![allow(dead_code)]

use greeter_core::pb::greeter_server::Greeter;
use greeter_core::pb::{HelloReply, HelloRequest};
use tonic::{Request, Response, Status};

// Replies with the value of a request header, or with the `grpc-timeout` it received.
pub struct MetadataGreeter {
    pub header: &'static str,
}

#[tonic::async_trait]
impl Greeter for MetadataGreeter {
    async fn say_hello(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let value = req
            .metadata()
            .get(self.header)
            .ok_or_else(|| Status::invalid_argument(format!("missing '{}'", self.header)))?
            .to_str()
            .map_err(|e| Status::invalid_argument(e.to_string()))?
            .to_string();

        Ok(Response::new(HelloReply { message: value }))
    }
}

// Always fails with the given status.
pub struct FailingGreeter {
    pub code: tonic::Code,
}

#[tonic::async_trait]
impl Greeter for FailingGreeter {
    async fn say_hello(
        &self,
        _req: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        Err(Status::new(self.code, "greeter is broken"))
    }
}

// Never replies.
pub struct SilentGreeter;

#[tonic::async_trait]
impl Greeter for SilentGreeter {
    async fn say_hello(
        &self,
        _req: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        std::future::pending().await
    }
}

// Replies `replies` times, then cancels `token` and stalls on every later call.
pub struct StallingGreeter {
    pub replies: usize,
    pub token: tokio_util::sync::CancellationToken,
    pub served: std::sync::atomic::AtomicUsize,
}

impl StallingGreeter {
    pub fn new(replies: usize, token: tokio_util::sync::CancellationToken) -> Self {
        Self {
            replies,
            token,
            served: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[tonic::async_trait]
impl Greeter for StallingGreeter {
    async fn say_hello(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let served = self
            .served
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if served >= self.replies {
            self.token.cancel();
            return std::future::pending().await;
        }

        Ok(Response::new(HelloReply {
            message: format!("Hello {}", req.into_inner().name),
        }))
    }
}
