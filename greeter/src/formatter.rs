use colored::*;
use greeter_core::{
    bench::{RoundTripReport, Summary},
    pb::HelloReply,
    tonic::Status,
};
use std::time::Duration;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<HelloReply> for FormattedString {
    fn from(reply: HelloReply) -> Self {
        FormattedString(format!("{} {}", "Reply:".green().bold(), reply.message))
    }
}

impl From<Status> for FormattedString {
    fn from(status: Status) -> Self {
        FormattedString(format!(
            "{} code={:?} message={:?}",
            "gRPC Failed:".red().bold(),
            status.code(),
            status.message()
        ))
    }
}

impl From<&RoundTripReport> for FormattedString {
    fn from(report: &RoundTripReport) -> Self {
        let mut out = format!(
            "{} {}\n{} {} ({} failed)",
            "Benchmark:".cyan().bold(),
            report.title(),
            "Attempts:".bold(),
            report.samples().len(),
            report.failures(),
        );

        match report.summary() {
            Some(Summary {
                min,
                q1,
                median,
                q3,
                max,
            }) => {
                for (label, value) in [
                    ("Min", min),
                    ("Q1", q1),
                    ("Median", median),
                    ("Q3", q3),
                    ("Max", max),
                ] {
                    out.push_str(&format!("\n  {:<7}{}", label.bold(), nanos(value)));
                }
            }
            None => out.push_str(&format!("\n  {}", "No samples".yellow())),
        }

        FormattedString(out)
    }
}

/// The report summary as JSON, durations in nanoseconds.
pub fn report_json(report: &RoundTripReport) -> serde_json::Value {
    let summary = report.summary().map(|s| {
        serde_json::json!({
            "min_ns": s.min.as_nanos() as u64,
            "q1_ns": s.q1.as_nanos() as u64,
            "median_ns": s.median.as_nanos() as u64,
            "q3_ns": s.q3.as_nanos() as u64,
            "max_ns": s.max.as_nanos() as u64,
        })
    });

    serde_json::json!({
        "title": report.title(),
        "attempts": report.samples().len(),
        "failures": report.failures(),
        "summary": summary,
    })
}

fn nanos(d: Duration) -> String {
    format!("{} ns", d.as_nanos())
}
