//! Benchmark result reassembly
//!
//! Benchmark results arrive as `output` events. Usually one event carries the
//! whole line:
//!
//! ```text
//! BenchmarkStringConcat-4     133303     7665 ns/op     21080 B/op     99 allocs/op
//! ```
//!
//! but the go tool sometimes splits it into a name fragment and a metrics
//! fragment:
//!
//! ```text
//! "BenchmarkStringConcat-4     \t"
//! "  1290205\t       933.7 ns/op\n"
//! ```
//!
//! [`BenchReassembler`] buffers fragments until a line terminator shows up and
//! then parses the joined line.

use super::results::BenchmarkRecord;

/// What happened to an output fragment fed to the reassembler
#[derive(Debug, Clone, PartialEq)]
pub enum BenchFeed {
    /// Not benchmark text; the caller may echo it
    Passthrough,
    /// Buffered until the rest of the line arrives
    Pending,
    /// A complete benchmark line was consumed
    Complete(Option<BenchmarkRecord>),
}

impl BenchFeed {
    /// Whether the raw text should still be echoed to the user
    pub fn should_echo(&self) -> bool {
        matches!(self, BenchFeed::Passthrough)
    }
}

/// Stateful buffer for split benchmark result lines
#[derive(Debug, Default)]
pub struct BenchReassembler {
    buffer: String,
}

impl BenchReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partial line is waiting for its remainder
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feed one output fragment
    ///
    /// `last_test` is the most recently started test, `cpus` the configured
    /// concurrency counts that suffix benchmark names.
    pub fn feed(&mut self, last_test: &str, cpus: &[String], output: &str) -> BenchFeed {
        if output.is_empty() {
            return BenchFeed::Passthrough;
        }
        if !self.is_pending() && !is_bench_line(last_test, cpus, output) {
            return BenchFeed::Passthrough;
        }

        if !output.ends_with('\n') {
            self.buffer.push_str(output);
            return BenchFeed::Pending;
        }

        let line = if self.is_pending() {
            self.buffer.push_str(output);
            std::mem::take(&mut self.buffer)
        } else {
            output.to_string()
        };

        BenchFeed::Complete(parse_bench_line(&line))
    }
}

fn is_bench_line(last_test: &str, cpus: &[String], output: &str) -> bool {
    cpus.iter().any(|cpu| {
        if output.starts_with(&format!("{}-{} ", last_test, cpu))
            || output.starts_with(&format!("{}-{}\t", last_test, cpu))
        {
            return true;
        }
        // at GOMAXPROCS=1 the runtime drops the suffix
        cpu == "1"
            && !last_test.is_empty()
            && (output.starts_with(&format!("{} ", last_test))
                || output.starts_with(&format!("{}\t", last_test)))
    })
}

/// Parse a whitespace-separated benchmark result line
///
/// Fields are positional: name, iterations, ns/op, `ns/op`, B/op, `B/op`,
/// allocs/op, `allocs/op`. Missing trailing fields stay zero.
pub fn parse_bench_line(line: &str) -> Option<BenchmarkRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let name = fields.first()?;

    let mut bench = BenchmarkRecord {
        name: name.to_string(),
        ..Default::default()
    };
    if let Some(iterations) = fields.get(1) {
        bench.iterations = iterations.parse().unwrap_or(0);
    }
    if let Some(ns) = fields.get(2) {
        bench.ns_per_op = strip_unit(ns, "ns/op").parse().unwrap_or(0.0);
    }
    if let Some(bytes) = fields.get(4) {
        bench.bytes_per_op = strip_unit(bytes, "B/op").parse().unwrap_or(0);
    }
    if let Some(allocs) = fields.get(6) {
        bench.allocs_per_op = strip_unit(allocs, "allocs/op").parse().unwrap_or(0);
    }

    Some(bench)
}

fn strip_unit<'a>(field: &'a str, unit: &str) -> &'a str {
    field.strip_suffix(unit).unwrap_or(field)
}
