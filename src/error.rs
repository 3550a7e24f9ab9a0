// src/error.rs
use thiserror::Error;

/// Feed could not be obtained for this cycle.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("reading feed override {path}: {source}")]
    Override {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("feed is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("feed payload was empty")]
    EmptyPayload,

    #[error("feed fetch timed out after {0} ms")]
    Timeout(u64),

    #[error("feed fetch failed: {0}")]
    Fetch(String),

    #[error("failed to fetch feed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// League catalog file could not be loaded.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("reading league catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing league catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tabular store failures. A failure on one league leaves earlier leagues written.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink authentication failed: {0}")]
    Auth(String),

    #[error("sink {op} failed for {league}: {message}")]
    Write {
        league: String,
        op: SinkOp,
        message: String,
    },

    #[error("sink {op} timed out for {league}")]
    Timeout { league: String, op: SinkOp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOp {
    Connect,
    Lookup,
    Create,
    Clear,
    Header,
    Append,
}

impl std::fmt::Display for SinkOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SinkOp::Connect => "connect",
            SinkOp::Lookup => "lookup",
            SinkOp::Create => "create",
            SinkOp::Clear => "clear",
            SinkOp::Header => "header",
            SinkOp::Append => "append",
        };
        f.write_str(s)
    }
}

/// Anything that ends a cycle early. Caught at the scheduler boundary.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("writing snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),
}
