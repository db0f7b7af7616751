use std::time::Duration;

/// Failure of a single MetricSource query.
///
/// The sample engine never surfaces these to its caller; each one only
/// blanks the field it was queried for.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The subsystem does not exist on this host (no sensors, no battery).
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),

    /// The subsystem exists but reported nothing usable this time.
    #[error("{0} is currently unavailable")]
    Unavailable(&'static str),

    #[error("{metric} query failed: {reason}")]
    Query {
        metric: &'static str,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("address resolution failed: {0}")]
    Resolve(String),
}

/// Failure of any stage of a speed test. A failed run never carries
/// partial measurements.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("malformed probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no speed test server available")]
    NoServer,

    #[error("measurement requested before a server was selected")]
    NoServerSelected,

    #[error("speed test did not finish within {0:?}")]
    Timeout(Duration),

    #[error("speed test cancelled")]
    Cancelled,

    #[error("speed test worker failed: {0}")]
    Worker(String),

    #[error("could not construct probe: {0}")]
    Construct(String),
}
