use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Generic = 1,
    Auth = 2,
    Usage = 3,
    Network = 4,
    RateLimited = 5,
    Server = 6,
    Config = 7,
    Upstream = 8,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Server(String),
    #[error("{0}")]
    Generic(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => ExitCode::Usage as i32,
            CliError::Config(_) => ExitCode::Config as i32,
            CliError::Auth(_) => ExitCode::Auth as i32,
            CliError::Network(_) => ExitCode::Network as i32,
            CliError::RateLimited(_) => ExitCode::RateLimited as i32,
            CliError::Upstream { .. } => ExitCode::Upstream as i32,
            CliError::Server(_) => ExitCode::Server as i32,
            CliError::Generic(_) => ExitCode::Generic as i32,
        }
    }

    /// Classify a failed HTTP exchange by its status code.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => CliError::Usage(message),
            401 | 403 => CliError::Auth(message),
            429 => CliError::RateLimited(message),
            _ => CliError::Upstream { status, message },
        }
    }

    /// HTTP-style status used when the error crosses the chat wire.
    pub fn status(&self) -> u16 {
        match self {
            CliError::Usage(_) => 400,
            CliError::Auth(_) => 401,
            CliError::Config(_) => 503,
            CliError::RateLimited(_) => 429,
            CliError::Upstream { status, .. } => *status,
            CliError::Network(_) | CliError::Server(_) | CliError::Generic(_) => 500,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        CliError::Generic(format!("I/O error: {value}"))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        CliError::Generic(format!("JSON error: {value}"))
    }
}

impl From<url::ParseError> for CliError {
    fn from(value: url::ParseError) -> Self {
        CliError::Usage(format!("Invalid URL: {value}"))
    }
}

impl From<reqwest::Error> for CliError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return CliError::Network("Request timed out.".to_string());
        }
        CliError::Network(format!("Network request failed: {value}"))
    }
}

pub fn with_debug_hint(message: &str, debug: bool) -> String {
    if debug {
        return message.to_string();
    }
    format!("{message} (try --debug for details)")
}

pub fn redact_secret(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    chars
        .iter()
        .enumerate()
        .map(|(idx, c)| if idx < 3 || idx + 3 >= len { *c } else { '*' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_edges_only() {
        assert_eq!(redact_secret("abcdefghij"), "abc****hij");
        assert_eq!(redact_secret("abc"), "abc");
        assert_eq!(redact_secret(""), "");
    }

    #[test]
    fn wire_status_follows_error_kind() {
        assert_eq!(CliError::Usage("x".into()).status(), 400);
        assert_eq!(CliError::Config("x".into()).status(), 503);
        assert_eq!(
            CliError::Upstream {
                status: 404,
                message: "gone".into()
            }
            .status(),
            404
        );
        assert_eq!(CliError::Network("x".into()).status(), 500);
    }

    #[test]
    fn from_status_round_trips_through_status() {
        for code in [400, 401, 429, 404, 500, 502, 503] {
            assert_eq!(CliError::from_status(code, "x".into()).status(), code);
        }
    }

    #[test]
    fn debug_hint_only_without_debug() {
        assert_eq!(with_debug_hint("boom", true), "boom");
        assert!(with_debug_hint("boom", false).contains("--debug"));
    }
}
