use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Machine-readable code of an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AuthError,
    RateLimitError,
    NetworkError,
    NotFoundError,
    ValidationError,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthError => "auth_error",
            ErrorCode::RateLimitError => "rate_limit_error",
            ErrorCode::NetworkError => "network_error",
            ErrorCode::NotFoundError => "not_found_error",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::UnknownError => "unknown_error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::AuthError | ErrorCode::RateLimitError => Severity::Critical,
            ErrorCode::NetworkError | ErrorCode::UnknownError => Severity::High,
            ErrorCode::NotFoundError => Severity::Medium,
            ErrorCode::ValidationError => Severity::Low,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a classified error. Ordering follows priority: `Critical` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Numeric priority, lower is more severe
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }
}

/// An upstream fetch failure after classification
///
/// Never persisted; it only travels with the read that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {message} ({url})")]
pub struct ClassifiedError {
    pub message: String,
    pub status: Option<u16>,
    pub code: ErrorCode,
    pub url: String,
}

impl ClassifiedError {
    pub fn new(code: ErrorCode, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code,
            url: url.into(),
        }
    }

    /// Classify a failure from its HTTP status (when known) and message
    ///
    /// Status codes win over message heuristics:
    /// - 401 is an auth error
    /// - 403 is a rate-limit error unless the message points at permissions
    /// - 429 is a rate-limit error
    /// - 404 is a not-found error
    ///
    /// Otherwise the message is matched for "timeout"/"network" (network error)
    /// and "json" (validation error).
    pub fn classify(message: impl Into<String>, status: Option<u16>, url: impl Into<String>) -> Self {
        let message = message.into();
        let code = classify_code(&message, status);
        Self {
            message,
            status,
            code,
            url: url.into(),
        }
    }

    /// Classify a transport failure raised by the HTTP client
    pub fn from_transport(err: &reqwest::Error, url: &str) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();

        let code = if status.is_some() {
            classify_code(&message, status)
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorCode::NetworkError
        } else if err.is_decode() {
            ErrorCode::ValidationError
        } else {
            classify_code(&message, None)
        };

        Self {
            message,
            status,
            code,
            url: url.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }

    /// Keep whichever of the two errors is more severe; ties keep the current one
    pub fn most_severe(current: Option<Self>, candidate: Self) -> Option<Self> {
        match current {
            Some(existing) if existing.severity() <= candidate.severity() => Some(existing),
            _ => Some(candidate),
        }
    }
}

fn classify_code(message: &str, status: Option<u16>) -> ErrorCode {
    let lowered = message.to_ascii_lowercase();

    match status {
        Some(401) => return ErrorCode::AuthError,
        Some(403) if mentions_permission(&lowered) => return ErrorCode::AuthError,
        Some(403) | Some(429) => return ErrorCode::RateLimitError,
        Some(404) => return ErrorCode::NotFoundError,
        _ => {}
    }

    if lowered.contains("timeout") || lowered.contains("timed out") || lowered.contains("network")
    {
        ErrorCode::NetworkError
    } else if lowered.contains("json") {
        ErrorCode::ValidationError
    } else {
        ErrorCode::UnknownError
    }
}

fn mentions_permission(lowered: &str) -> bool {
    !lowered.contains("rate limit")
        && (lowered.contains("permission")
            || lowered.contains("forbidden")
            || lowered.contains("bad credentials")
            || lowered.contains("resource not accessible"))
}
