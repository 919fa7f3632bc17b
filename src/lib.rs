/*!
ox3-client: a blocking client for the OpenX OX3 API.

# Overview

OX3 authorizes API access through an OAuth 1.0a three-legged login against
`sso.openx.com`. This crate performs that login with an account's email and
password, keeps the resulting access token in a cookie jar, and signs every
following request with the same OAuth1 credentials, so callers only deal with
endpoint paths below `/ox/4.0/`.

Responses are handed back as [`reqwest::blocking::Response`] without any
decoding.

# How to use

## Logging in

```no_run
use ox3_client::{establish, Credentials, QueryParams};

let credentials = Credentials::new(
    "example.openx.net",
    "example_ad_server",
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "user@example.com",
    "[PASSWORD]",
);
let mut client = establish(&credentials, false)?;

// GET http://example.openx.net/ox/4.0/adunit?offset=0&limit=500
let params = QueryParams::new().push("offset", 0).push("limit", 500);
let ad_units = client.get("/adunit", Some(&params))?;
println!("{}", ad_units.text()?);

client.log_off()?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Logging in from a config file

```no_run
use ox3_client::{establish_from_file, write_config_template};

// writes ./openx_config.json with placeholder values to fill in
let path = write_config_template(".")?;
let client = establish_from_file(&path, true)?;
let categories = client.options("ad_category_options")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

With the debug flag set, the handshake reports each step as a `tracing`
event at `TRACE` level.
*/
mod client;
mod credentials;
mod error;
mod handshake;
mod query;
mod secrets;
mod session;
mod signer;
mod token_reader;

// exposed to external program
pub use client::Client;
pub use credentials::{write_config_template, Credentials};
pub use error::{
    ConfigError, Error, HandshakeError, Result, TokenKind, TokenReaderError, TokenReaderResult,
};
pub use handshake::{establish, establish_from_file, Handshake, SsoEndpoints};
pub use query::{QueryParams, QueryValue};
pub use secrets::{Secrets, SecretsProvider};
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{TokenReader, TokenResponse};

// exposed constant variables
/// Name of the cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "openx3_access_token";
/// Path prefix of every API endpoint.
pub const API_PATH: &str = "/ox/4.0/";
/// File name used by [`write_config_template`] when given a directory.
pub const CONFIG_FILE_NAME: &str = "openx_config.json";
/// Scheme API requests are sent with.
pub const DEFAULT_SCHEME: &str = "http";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
pub(crate) const OAUTH_TOKEN_KEY: &str = "oauth_token";
