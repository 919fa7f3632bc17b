use std::collections::HashMap;

use reqwest::blocking::Response;
use reqwest::header::{HeaderMap, LOCATION};
use serde::Deserialize;
use url::Url;

use crate::{
    HandshakeError, TokenReaderError, TokenReaderResult, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

/// Add parse_oauth_token feature to reqwest::blocking::Response.
// this trait is sealed
pub trait TokenReader: private::Sealed {
    fn parse_oauth_token(self) -> Result<TokenResponse, HandshakeError>;
}

impl TokenReader for Response {
    fn parse_oauth_token(self) -> Result<TokenResponse, HandshakeError> {
        let status = self.status();
        if !status.is_success() {
            return Err(HandshakeError::Status(status));
        }
        let text = self.text()?;
        Ok(read_oauth_token(text)?)
    }
}

impl<E> TokenReader for Result<Response, E>
where
    E: Into<HandshakeError>,
{
    fn parse_oauth_token(self) -> Result<TokenResponse, HandshakeError> {
        match self {
            Ok(resp) => resp.parse_oauth_token(),
            Err(err) => Err(err.into()),
        }
    }
}

pub(crate) fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

/// Finds `oauth_verifier` in a login response.
///
/// Checked in order: an `oauth_verifier` header, the query of a `Location`
/// header, the body read as a URL, the body read as a bare query string.
pub(crate) fn read_oauth_verifier(headers: &HeaderMap, body: &str) -> TokenReaderResult<String> {
    if let Some(verifier) = headers
        .get(OAUTH_VERIFIER_KEY)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Ok(verifier.to_string());
    }

    let location = headers.get(LOCATION).and_then(|v| v.to_str().ok());
    if let Some(verifier) = location.and_then(verifier_in_url) {
        return Ok(verifier);
    }

    let body = body.trim();
    verifier_in_url(body)
        .or_else(|| verifier_in_query(body.trim_start_matches('?')))
        .ok_or_else(|| TokenReaderError::TokenKeyNotFound(OAUTH_VERIFIER_KEY, body.to_string()))
}

fn verifier_in_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    verifier_in_query(url.query()?)
}

fn verifier_in_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, v)| k == OAUTH_VERIFIER_KEY && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

mod private {
    use reqwest::blocking::Response;

    use crate::HandshakeError;

    pub trait Sealed {}
    impl Sealed for Response {}
    impl<E> Sealed for Result<Response, E> where E: Into<HandshakeError> {}
}

#[cfg(test)]
mod test {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn parse_response_typical() {
        let resp_str_sample = "oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik&oauth_token_secret=Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM&oauth_callback_confirmed=true";
        for parsed in &[
            read_oauth_token(resp_str_sample.to_string()).unwrap(),
            serde_urlencoded::from_str::<TokenResponse>(resp_str_sample).unwrap(),
        ] {
            assert_eq!(
                parsed.oauth_token,
                "Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik"
            );
            assert_eq!(
                parsed.oauth_token_secret,
                "Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM"
            );
            assert_eq!(parsed.remain.len(), 1);
            assert_eq!(parsed.remain["oauth_callback_confirmed"], "true");
        }
    }

    #[test]
    fn parse_minimal() {
        let parsed = read_oauth_token("oauth_token&oauth_token_secret".to_string()).unwrap();
        assert_eq!(parsed.oauth_token, "");
        assert_eq!(parsed.oauth_token_secret, "");
        assert!(parsed.remain.is_empty());
    }

    #[test]
    fn parse_percent_encoded_tokens() {
        let parsed =
            read_oauth_token("oauth_token=req%2Btok&oauth_token_secret=a+b%2Fc".to_string()).unwrap();
        assert_eq!(parsed.oauth_token, "req+tok");
        assert_eq!(parsed.oauth_token_secret, "a b/c");
    }

    #[test]
    fn parse_token_notfound() {
        let parsed = read_oauth_token("oauth_token_secret=".to_string());
        assert_eq!(
            parsed.unwrap_err(),
            TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, "oauth_token_secret=".into())
        );
    }

    #[test]
    fn parse_token_secret_notfound() {
        let parsed = read_oauth_token("oauth_token=".to_string());
        assert_eq!(
            parsed.unwrap_err(),
            TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_SECRET_KEY, "oauth_token=".into())
        );
    }

    #[test]
    fn verifier_from_body_url() {
        let body = "https://sso.example.com/login/oob?oauth_token=abc&oauth_verifier=v3r1f13r\n";
        let verifier = read_oauth_verifier(&HeaderMap::new(), body).unwrap();
        assert_eq!(verifier, "v3r1f13r");
    }

    #[test]
    fn verifier_from_bare_query_body() {
        let verifier =
            read_oauth_verifier(&HeaderMap::new(), "oauth_token=abc&oauth_verifier=x%2By").unwrap();
        assert_eq!(verifier, "x+y");
    }

    #[test]
    fn verifier_from_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(OAUTH_VERIFIER_KEY, HeaderValue::from_static("from-header"));
        let verifier = read_oauth_verifier(&headers, "oauth_verifier=from-body").unwrap();
        assert_eq!(verifier, "from-header");
    }

    #[test]
    fn verifier_from_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("http://localhost/oob?oauth_token=t&oauth_verifier=loc"),
        );
        let verifier = read_oauth_verifier(&headers, "").unwrap();
        assert_eq!(verifier, "loc");
    }

    #[test]
    fn verifier_missing() {
        let err = read_oauth_verifier(&HeaderMap::new(), "<html>login failed</html>").unwrap_err();
        assert_eq!(
            err,
            TokenReaderError::TokenKeyNotFound(
                OAUTH_VERIFIER_KEY,
                "<html>login failed</html>".to_string()
            )
        );
    }
}
