//! Transfer failure types.

use std::error::Error as StdError;
use std::io;

use webstash_core::Error;

/// Why a transfer stopped before its body was fully read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// The overall deadline elapsed. `after_ms` is absent when the transport
    /// reported the timeout without saying which deadline fired.
    #[error("request timed out{}", deadline_suffix(.after_ms))]
    Timeout { after_ms: Option<u64> },

    /// Connection, TLS, DNS or body read failure.
    #[error("network error: {message}")]
    Network {
        message: String,
        /// Code carried by the failure itself.
        code: Option<String>,
        /// Code found deeper in the cause chain.
        cause_code: Option<String>,
    },

    /// The request could not be built (bad method or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchFailure {
    /// Code recorded on the fetch record.
    ///
    /// Precedence: timeout, then the failure's own code, then a nested cause's
    /// code, then none.
    pub fn error_code(&self) -> Option<String> {
        match self {
            FetchFailure::Timeout { .. } => Some("ETIMEDOUT".to_string()),
            FetchFailure::Network { code, cause_code, .. } => code.clone().or_else(|| cause_code.clone()),
            FetchFailure::InvalidRequest(_) => None,
        }
    }

}

impl From<&FetchFailure> for Error {
    fn from(failure: &FetchFailure) -> Self {
        match failure {
            FetchFailure::Timeout { .. } => Error::Timeout(failure.to_string()),
            FetchFailure::Network { .. } => Error::Network { message: failure.to_string(), code: failure.error_code() },
            FetchFailure::InvalidRequest(msg) => Error::InvalidInput(msg.clone()),
        }
    }
}

fn deadline_suffix(after_ms: &Option<u64>) -> String {
    after_ms.map(|ms| format!(" after {ms}ms")).unwrap_or_default()
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchFailure::Timeout { after_ms: None };
        }
        if err.is_builder() {
            return FetchFailure::InvalidRequest(err.to_string());
        }

        let direct = err.source();
        let code = direct.and_then(io_code);
        let cause_code = direct.and_then(|source| source.source()).and_then(first_io_code);

        let mut message = err.to_string();
        if let Some(source) = direct {
            message = format!("{message}: {source}");
        }

        FetchFailure::Network { message, code, cause_code }
    }
}

fn first_io_code(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(code) = io_code(err) {
            return Some(code);
        }
        current = err.source();
    }
    None
}

fn io_code(err: &(dyn StdError + 'static)) -> Option<String> {
    err.downcast_ref::<io::Error>().map(io_error_code)
}

/// Maps an I/O error to the conventional errno-style name.
pub(crate) fn io_error_code(err: &io::Error) -> String {
    let code = match err.kind() {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::NotConnected => "ENOTCONN",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::AddrInUse => "EADDRINUSE",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::HostUnreachable => "EHOSTUNREACH",
        io::ErrorKind::NetworkUnreachable => "ENETUNREACH",
        io::ErrorKind::UnexpectedEof => "EOF",
        _ if err.to_string().contains("lookup") => "ENOTFOUND",
        _ => return err.raw_os_error().map_or_else(|| "EIO".to_string(), |raw| format!("OS_ERROR_{raw}")),
    };
    code.to_string()
}
