use clap::{Parser, ValueEnum};

/// Output format for tracing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for local development.
    Pretty,
    /// Newline-delimited JSON for log aggregation.
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "seatwatch", about = "Seat-availability API for the student registration portal")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}
