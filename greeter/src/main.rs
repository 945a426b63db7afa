//! # Greeter CLI Entry Point
//!
//! The main executable for the Greeter service. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the
//!    `tracing` subscriber (filtered by `RUST_LOG`, `info` by default).
//! 2. **Execution**: Runs a server, sends a single call, or benchmarks round trips through
//!    `greeter_core`.
//! 3. **Presentation**: Formats and prints the reply, the error status or the benchmark summary.
mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{CallArgs, Cli, Commands};
use formatter::FormattedString;
use greeter_core::{
    bench::measure_round_trips,
    client::{BlockingGreeterClient, GreeterClient, StubConfig},
    pb::HelloRequest,
    server::{HelloGreeter, ServeOptions, serve},
    tokio_util::sync::CancellationToken,
};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    match args.command {
        // The blocking stub drives its own runtime, so it must run outside of one.
        Commands::Hello {
            url,
            call,
            blocking: true,
        } => say_hello_blocking(&url, call),
        command => tokio::runtime::Runtime::new()
            .context("Failed to start the tokio runtime")?
            .block_on(run(command)),
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            addr,
            prefix,
            reflection,
        } => run_server(addr, prefix, reflection).await,
        Commands::Hello { url, call, .. } => say_hello(&url, call).await,
        Commands::Bench {
            url,
            call,
            attempts,
            output,
            json,
        } => run_bench(&url, call, attempts as usize, output, json).await,
    }
}

fn stub_config(call: &CallArgs) -> StubConfig {
    StubConfig {
        timeout: call.timeout_ms.map(Duration::from_millis),
        connect_timeout: None,
        headers: call.headers.clone(),
    }
}

// Cancels the token on Ctrl-C so in-flight calls stop with `Cancelled`.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        ctrl_c().await;
        child.cancel();
    });

    token
}

// Same as `cancel_on_ctrl_c`, for callers outside of a runtime: `signal` is awaited on a
// dedicated thread.
fn cancel_when<F>(signal: F) -> anyhow::Result<CancellationToken>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let child = token.clone();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the signal runtime")?;

    std::thread::spawn(move || {
        rt.block_on(signal);
        child.cancel();
    });

    Ok(token)
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("interrupted, cancelling");
    } else {
        std::future::pending::<()>().await;
    }
}

async fn run_server(
    addr: std::net::SocketAddr,
    prefix: String,
    reflection: bool,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind '{addr}'"))?;

    let options = ServeOptions { reflection };

    serve(listener, HelloGreeter::new(prefix), &options, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;

    Ok(())
}

async fn say_hello(url: &str, call: CallArgs) -> anyhow::Result<()> {
    let mut client = GreeterClient::connect_with_config(url, &stub_config(&call)).await?;
    let token = cancel_on_ctrl_c();

    let request = HelloRequest { name: call.name };

    match client.say_hello(request, &token).await {
        Ok(reply) => println!("{}", FormattedString::from(reply.into_inner())),
        Err(status) => {
            eprintln!("{}", FormattedString::from(status));
            process::exit(1);
        }
    }

    Ok(())
}

fn say_hello_blocking(url: &str, call: CallArgs) -> anyhow::Result<()> {
    let mut client = BlockingGreeterClient::connect_with_config(url, &stub_config(&call))?;
    let token = cancel_when(ctrl_c())?;

    let request = HelloRequest { name: call.name };

    match client.say_hello(request, &token) {
        Ok(reply) => println!("{}", FormattedString::from(reply.into_inner())),
        Err(status) => {
            eprintln!("{}", FormattedString::from(status));
            process::exit(1);
        }
    }

    Ok(())
}

async fn run_bench(
    url: &str,
    call: CallArgs,
    attempts: usize,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut client = GreeterClient::connect_with_config(url, &stub_config(&call)).await?;
    let token = cancel_on_ctrl_c();

    let title = format!("RoundTrip_SmallMsg_{}", url);
    let report = measure_round_trips(&mut client, title, &call.name, attempts, &token).await;

    if let Some(path) = output {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create '{}'", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        report
            .write_csv(&mut writer)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&formatter::report_json(&report))?);
    } else {
        println!("{}", FormattedString::from(&report));
    }

    Ok(())
}
