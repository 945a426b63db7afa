use greeter_core::client::{
    BlockingGreeterClient, ClientConnectError, GreeterClient, StubConfig, new_stub,
    new_stub_with_config,
};
use greeter_core::pb::HelloRequest;
use greeter_core::pb::greeter_server::Greeter;
use greeter_core::server::{HelloGreeter, ServeOptions, serve};
use std::net::SocketAddr;
use std::time::Duration;
use test_greeters::SilentGreeter;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::Code;
use tonic::transport::Endpoint;

mod test_greeters;

struct RunningServer {
    url: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), greeter_core::server::ServeError>>,
}

impl RunningServer {
    async fn stop(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
    }
}

async fn start_server(options: ServeOptions) -> RunningServer {
    start_server_with(HelloGreeter::default(), options).await
}

async fn start_server_with<T: Greeter>(greeter: T, options: ServeOptions) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        serve(listener, greeter, &options, async {
            let _ = stopped.await;
        })
        .await
    });

    RunningServer {
        url: format!("http://{addr}"),
        stop,
        handle,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_say_hello_over_tcp() {
    let server = start_server(ServeOptions::default()).await;

    let mut client = GreeterClient::connect(&server.url).await.unwrap();

    let reply = client
        .say_hello(
            HelloRequest {
                name: "world".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.into_inner().message, "Hello world");

    drop(client);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_say_hello_with_reflection_enabled() {
    let server = start_server(ServeOptions { reflection: true }).await;

    let config = StubConfig {
        timeout: Some(Duration::from_secs(5)),
        connect_timeout: Some(Duration::from_secs(5)),
        headers: vec![("x-client".to_string(), "e2e".to_string())],
    };
    let mut client = GreeterClient::connect_with_config(&server.url, &config)
        .await
        .unwrap();

    let reply = client
        .say_hello(
            HelloRequest {
                name: "reflection".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.into_inner().message, "Hello reflection");

    drop(client);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stubs_share_a_channel() {
    let server = start_server(ServeOptions::default()).await;

    let channel = Endpoint::from_shared(server.url.clone())
        .unwrap()
        .connect()
        .await
        .unwrap();

    let mut plain = new_stub(channel.clone());
    let config = StubConfig {
        timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let mut configured = new_stub_with_config(channel, &config).unwrap();
    let token = CancellationToken::new();

    let first = plain
        .say_hello(HelloRequest { name: "one".to_string() }, &token)
        .await
        .unwrap();
    let second = configured
        .say_hello(HelloRequest { name: "two".to_string() }, &token)
        .await
        .unwrap();

    assert_eq!(first.into_inner().message, "Hello one");
    assert_eq!(second.into_inner().message, "Hello two");

    drop(plain);
    drop(configured);
    server.stop().await;
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let err = GreeterClient::connect(&format!("http://{addr}"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientConnectError::ConnectionFailed(..)));
}

#[test]
fn test_blocking_client() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let server = rt.block_on(start_server(ServeOptions::default()));

    let mut client = BlockingGreeterClient::connect(&server.url).unwrap();
    let token = CancellationToken::new();

    for name in ["sync", "calls"] {
        let reply = client
            .say_hello(
                HelloRequest {
                    name: name.to_string(),
                },
                &token,
            )
            .unwrap();

        assert_eq!(reply.into_inner().message, format!("Hello {name}"));
    }

    drop(client);
    rt.block_on(server.stop());
}

#[test]
fn test_blocking_client_with_cancelled_token() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let server = rt.block_on(start_server(ServeOptions::default()));

    let mut client = BlockingGreeterClient::connect(&server.url).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let status = client
        .say_hello(
            HelloRequest {
                name: "never sent".to_string(),
            },
            &token,
        )
        .unwrap_err();

    assert_eq!(status.code(), Code::Cancelled);

    drop(client);
    rt.block_on(server.stop());
}

#[test]
fn test_blocking_client_cancelled_from_another_thread() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let server = rt.block_on(start_server_with(SilentGreeter, ServeOptions::default()));

    let mut client = BlockingGreeterClient::connect(&server.url).unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    let cancel_thread = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let status = client
        .say_hello(
            HelloRequest {
                name: "stalled".to_string(),
            },
            &token,
        )
        .unwrap_err();

    assert_eq!(status.code(), Code::Cancelled);

    cancel_thread.join().unwrap();
    drop(client);
    // The silent handler never finishes, so a graceful stop would wait forever.
    drop(server);
    rt.shutdown_background();
}
