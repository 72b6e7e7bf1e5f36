use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use codec::{JsonReader, SpanDecoder};
use comfy_table::Table;
use common::Span;
use itertools::Itertools;

/// Decodes a file of Zipkin v2 span JSON objects (one per line) and prints a
/// summary of what was read.
#[derive(Parser)]
#[clap(name = "codec")]
struct Args {
    /// File with one span JSON object per line
    input: PathBuf,
    /// Abort on the first malformed span instead of skipping it
    #[clap(long)]
    strict: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let buf = fs::read(&args.input)?;
    let mut decoder = SpanDecoder::new();
    let mut spans: Vec<Span> = Vec::new();
    let mut rejected = 0usize;

    for (number, line) in buf.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        let mut reader = JsonReader::new(line);
        match decoder.decode(&mut reader) {
            Ok(span) => spans.push(span),
            Err(err) => {
                if args.strict {
                    return Err(format!("line {}: {}", number + 1, err).into());
                }
                log::warn!("skipping line {}: {}", number + 1, err);
                rejected += 1;
            }
        }
    }

    println!("{}", summary(&spans, rejected));
    Ok(())
}

fn summary(spans: &[Span], rejected: usize) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["metric", "value"]);
    table.add_row(vec!["spans decoded".to_string(), spans.len().to_string()]);
    table.add_row(vec!["spans rejected".to_string(), rejected.to_string()]);
    table.add_row(vec![
        "distinct traces".to_string(),
        spans
            .iter()
            .map(|span| span.trace_id.as_str())
            .unique()
            .count()
            .to_string(),
    ]);
    table.add_row(vec![
        "services".to_string(),
        spans
            .iter()
            .filter_map(|span| span.local_endpoint.as_ref())
            .filter_map(|endpoint| endpoint.service_name.as_deref())
            .unique()
            .sorted()
            .join(", "),
    ]);
    table.add_row(vec![
        "kinds".to_string(),
        spans
            .iter()
            .filter_map(|span| span.kind)
            .counts()
            .into_iter()
            .sorted_by_key(|(kind, _)| kind.name())
            .map(|(kind, count)| format!("{}={}", kind.name(), count))
            .join(", "),
    ]);
    if let Some(first) = spans.iter().filter_map(|span| span.timestamp).min() {
        table.add_row(vec!["first span".to_string(), format_micros(first)]);
    }
    if let Some(last) = spans.iter().filter_map(|span| span.timestamp).max() {
        table.add_row(vec!["last span".to_string(), format_micros(last)]);
    }
    table
}

fn format_micros(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    match Utc.timestamp_opt(secs, nanos).single() {
        Some(when) => when.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        None => micros.to_string(),
    }
}
