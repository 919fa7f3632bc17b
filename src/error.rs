use std::{fmt, io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid credentials : {0} cannot be empty")]
    Validation(&'static str),
    #[error("configuration failed : {0}")]
    Config(#[from] ConfigError),
    #[error("{0} could not be generated : {1}")]
    Handshake(TokenKind, #[source] HandshakeError),
    #[error("login rejected by the provider with status {0}")]
    Authentication(StatusCode),
    #[error("unexpected provider response : {0}")]
    Protocol(#[source] TokenReaderError),
    #[error("unsupported query parameter {0} : value must be a string, integer, float or bool")]
    UnsupportedParameter(String),
    #[error("endpoint could not be parsed : {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// The token a failed handshake step was trying to obtain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    RequestToken,
    AccessToken,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::RequestToken => f.write_str("request token"),
            TokenKind::AccessToken => f.write_str("access token"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("token endpoint unreachable : {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint answered with status {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Token(#[from] TokenReaderError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {} : {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("could not decode {} : {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {} : {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}
