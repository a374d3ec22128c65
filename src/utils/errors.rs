#![forbid(unsafe_code)]

use poem_openapi::Object;
use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("wordpage_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Reading wordlist file: {}", .0)]
    ReadingWordlistFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    /// Startup-time configuration failure; the wordlist itself must change.
    #[error("The dictionary must contain a prime number of words. Current count: {}", .0)]
    NonPrimeWordCount(usize),

    /// Per-lookup failure; the router maps it to a 404.
    #[error("Word \"{}\" not found in dictionary", .0)]
    WordNotFound(String),

    /// Per-lookup failure; the router maps it to a 404.
    #[error("Index {} not found in dictionary", .0)]
    IndexNotFound(usize),

    /// A request path segment that is not three hyphen-joined words.
    #[error("Invalid slug format: {}", .0)]
    InvalidSlug(String),
}

// ---------------------------------------------------------------------------
// HttpResult:
// ---------------------------------------------------------------------------
/// Body returned on non-200 responses.
#[derive(Object, Debug)]
pub struct HttpResult {
    pub result_code: String,
    pub result_msg: String,
}

impl HttpResult {
    pub fn new(result_code: String, result_msg: String) -> Self {
        HttpResult { result_code, result_msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_details() {
        let e = Errors::NonPrimeWordCount(370_104);
        assert!(e.to_string().contains("370104"));
        let e = Errors::WordNotFound("qwzx".to_string());
        assert!(e.to_string().contains("qwzx"));
        let e = Errors::IndexNotFound(97);
        assert!(e.to_string().contains("97"));
    }
}
