//! # Round-trip benchmark
//!
//! Measures the wall-clock time of sequential `SayHello` calls with a small string
//! payload and summarizes it with order statistics (min, quartiles, max).
//!
//! Failed calls do not abort the run: they are recorded with their status code and
//! their elapsed time still counts towards the summary.
use crate::BoxError;
use crate::client::GreeterClient;
use crate::pb::HelloRequest;
use http_body::Body as HttpBody;
use std::borrow::Cow;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tonic::{Code, client::GrpcService};

/// A single measured call.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub elapsed: Duration,
    /// The reply message, or the code of the status the call failed with.
    pub outcome: Result<String, Code>,
}

/// Order statistics over the elapsed times of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub min: Duration,
    pub q1: Duration,
    pub median: Duration,
    pub q3: Duration,
    pub max: Duration,
}

/// The samples of a benchmark run, in the order they were taken.
#[derive(Debug, Clone)]
pub struct RoundTripReport {
    title: String,
    samples: Vec<RoundTrip>,
}

impl RoundTripReport {
    pub fn new(title: impl Into<String>, samples: Vec<RoundTrip>) -> Self {
        Self {
            title: title.into(),
            samples,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn samples(&self) -> &[RoundTrip] {
        &self.samples
    }

    pub fn failures(&self) -> usize {
        self.samples.iter().filter(|s| s.outcome.is_err()).count()
    }

    fn sorted(&self) -> Vec<Duration> {
        let mut elapsed: Vec<Duration> = self.samples.iter().map(|s| s.elapsed).collect();
        elapsed.sort_unstable();
        elapsed
    }

    /// `None` when the run has no samples.
    pub fn summary(&self) -> Option<Summary> {
        let sorted = self.sorted();
        let n = sorted.len();

        if n == 0 {
            return None;
        }

        let q1 = n / 4;
        let q2 = n / 2;

        Some(Summary {
            min: sorted[0],
            q1: sorted[q1],
            median: sorted[q2],
            q3: sorted[q1 + q2],
            max: sorted[n - 1],
        })
    }

    /// Writes the report as CSV: raw samples, sorted samples, then the summary.
    /// All durations are in nanoseconds. Text fields are quoted as RFC 4180 requires.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "Benchmark Name,{},", csv_field(&self.title))?;
        writeln!(w)?;

        writeln!(w, "Run,Elapsed (ns),Outcome,")?;
        for (run, sample) in self.samples.iter().enumerate() {
            let outcome = match &sample.outcome {
                Ok(message) => format!("ok: {}", message),
                Err(code) => format!("failed: {:?}", code),
            };
            writeln!(
                w,
                "{},{},{},",
                run,
                sample.elapsed.as_nanos(),
                csv_field(&outcome)
            )?;
        }
        writeln!(w)?;

        writeln!(w, "Sorted Run,Elapsed (ns),")?;
        for (run, elapsed) in self.sorted().iter().enumerate() {
            writeln!(w, "{},{},", run, elapsed.as_nanos())?;
        }

        if let Some(summary) = self.summary() {
            writeln!(w)?;
            writeln!(w, "Min,{},", summary.min.as_nanos())?;
            writeln!(w, "Q1,{},", summary.q1.as_nanos())?;
            writeln!(w, "Median,{},", summary.median.as_nanos())?;
            writeln!(w, "Q3,{},", summary.q3.as_nanos())?;
            writeln!(w, "Max,{},", summary.max.as_nanos())?;
        }

        Ok(())
    }
}

// Quotes the field when it holds a separator, a quote or a line break.
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Issues `attempts` sequential `SayHello` calls with `name` and records each one.
///
/// Stops early, keeping the samples taken so far, when `token` is cancelled.
pub async fn measure_round_trips<S>(
    client: &mut GreeterClient<S>,
    title: impl Into<String>,
    name: &str,
    attempts: usize,
    token: &CancellationToken,
) -> RoundTripReport
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let mut samples = Vec::with_capacity(attempts);

    for run in 0..attempts {
        if token.is_cancelled() {
            tracing::info!(run, "benchmark cancelled");
            break;
        }

        let request = HelloRequest {
            name: name.to_string(),
        };

        let start = Instant::now();
        let result = client.say_hello(request, token).await;
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(reply) => Ok(reply.into_inner().message),
            Err(status) if status.code() == Code::Cancelled && token.is_cancelled() => {
                tracing::info!(run, "benchmark cancelled");
                break;
            }
            Err(status) => {
                tracing::warn!(run, code = ?status.code(), status_message = status.message(), "round trip failed");
                Err(status.code())
            }
        };

        tracing::debug!(run, elapsed_ns = elapsed.as_nanos() as u64, "round trip");

        samples.push(RoundTrip { elapsed, outcome });
    }

    RoundTripReport::new(title, samples)
}
