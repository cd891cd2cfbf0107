use thiserror::Error;

/// Transport-side failures. The run reports them and skips extraction.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        url: String,
        timeout: std::time::Duration,
    },

    #[error("{0} returned an empty body")]
    Empty(String),

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("document is not valid UTF-8 (invalid byte at offset {offset}) and declares no other charset")]
    Encoding { offset: usize },

    #[error("document is not valid {0}")]
    Malformed(String),

    #[error("unsupported charset {0:?}")]
    UnknownCharset(String),
}

#[derive(Error, Debug)]
#[error("invalid pattern {pattern:?}: {source}")]
pub struct InvalidPatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Per-call failures of the external classifier. Never abort extraction.
#[derive(Error, Debug)]
pub enum SentimentBridgeError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not answer within {timeout:?}")]
    Timeout {
        program: String,
        timeout: std::time::Duration,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{program} wrote output that is not UTF-8")]
    UnreadableOutput { program: String },

    #[error("{program} wrote no label")]
    EmptyOutput { program: String },
}

/// Terminal failures of a single run. Both leave the run with zero records.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),
}
