use thiserror::Error;

/// Invalid portal configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid portal base url {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Login handshake failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login did not set the {0} session cookie")]
    MissingSessionToken(String),
    #[error("login did not set a cookie ending in {0}")]
    MissingSecondaryToken(String),
    #[error("login request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read response body from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Where a table cell was expected in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPosition {
    First,
    Last,
}

impl std::fmt::Display for CellPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Usually the portal served its login page because the session expired.
    #[error("table #{0} not found in page")]
    TableNotFound(String),
    #[error("row {row}: {position} cell has no content")]
    MissingCell { row: usize, position: CellPosition },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("status has no \"by <name> on\" actor: {0:?}")]
    UnparseableStatus(String),
    #[error("status has no date: {0:?}")]
    MissingDate(String),
    #[error("invalid date {input:?}: {source}")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("date {0:?} does not use a full month name")]
    AbbreviatedMonth(String),
}

impl ParseError {
    /// Date problems leave the row usable; everything else does not.
    pub fn is_date_error(&self) -> bool {
        matches!(
            self,
            Self::MissingDate(_) | Self::InvalidDate { .. } | Self::AbbreviatedMonth(_)
        )
    }
}

/// A single poll pass failed and nothing was published.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extract failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("row {row} ({code}) could not be parsed: {source}")]
    Parse {
        row: usize,
        code: String,
        #[source]
        source: ParseError,
    },
}

impl PollError {
    /// Name of the pipeline stage that failed, for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Extract(_) => "extract",
            Self::Parse { .. } => "parse",
        }
    }
}
