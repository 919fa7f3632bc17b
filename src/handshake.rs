use std::{path::Path, sync::Arc};

use http::Method;
use reqwest::{
    blocking::Client as ReqwestClient, cookie::Jar, header::AUTHORIZATION, redirect::Policy, Url,
};

use crate::credentials::normalize_domain;
use crate::session::Session;
use crate::token_reader::{read_oauth_verifier, TokenReader, TokenResponse};
use crate::{
    Client, Credentials, Error, OAuthParameters, Result, Secrets, SecretsProvider, Signer,
    TokenKind, ACCESS_TOKEN_COOKIE, DEFAULT_SCHEME, OAUTH_TOKEN_KEY,
};

const REQUEST_TOKEN_URL: &str = "https://sso.openx.com/api/index/initiate";
const AUTHORIZATION_URL: &str = "https://sso.openx.com/login/process";
const ACCESS_TOKEN_URL: &str = "https://sso.openx.com/api/index/token";
const CALLBACK: &str = "oob";

/// The three SSO endpoints the handshake talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoEndpoints {
    pub request_token: String,
    pub authorize: String,
    pub access_token: String,
}

impl Default for SsoEndpoints {
    fn default() -> Self {
        SsoEndpoints {
            request_token: REQUEST_TOKEN_URL.to_string(),
            authorize: AUTHORIZATION_URL.to_string(),
            access_token: ACCESS_TOKEN_URL.to_string(),
        }
    }
}

/// Logs in with `credentials` against the OpenX SSO and returns a client
/// bound to the resulting session.
///
/// With `debug` set, each step emits a `trace` event.
pub fn establish(credentials: &Credentials, debug: bool) -> Result<Client> {
    Handshake::new(credentials).debug(debug).establish()
}

/// Like [`establish`], reading the credentials from a JSON config file first.
pub fn establish_from_file<P: AsRef<Path>>(path: P, debug: bool) -> Result<Client> {
    let credentials = Credentials::from_file(path)?;
    establish(&credentials, debug)
}

/// One OAuth1 three-legged login.
///
/// Everything the exchange needs, consumer included, lives in this value and
/// dies with it.
///
/// ```no_run
/// use ox3_client::{Credentials, Handshake};
///
/// let credentials = Credentials::from_file("openx_config.json")?;
/// let client = Handshake::new(&credentials).debug(true).establish()?;
/// let reports = client.get("/report/get_reportlist", None)?;
/// println!("{}", reports.text()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Handshake<'a> {
    credentials: &'a Credentials,
    endpoints: SsoEndpoints,
    debug: bool,
}

impl<'a> Handshake<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Handshake {
            credentials,
            endpoints: SsoEndpoints::default(),
            debug: false,
        }
    }

    /// Talk to other SSO endpoints, e.g. a staging or mock provider.
    pub fn endpoints(self, endpoints: SsoEndpoints) -> Self {
        Handshake { endpoints, ..self }
    }

    pub fn debug(self, debug: bool) -> Self {
        Handshake { debug, ..self }
    }

    /// Runs the whole exchange. No client exists unless every step succeeds.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] for a blank credential, before any request.
    /// * [`Error::Handshake`] when a request or access token cannot be had.
    /// * [`Error::Authentication`] when the login is rejected.
    /// * [`Error::Protocol`] when the login response holds no verifier.
    /// * [`Error::Reqwest`] for transport failures during login.
    pub fn establish(self) -> Result<Client> {
        self.credentials.validate()?;

        let credentials = self.credentials;
        let consumer = Secrets::new(
            credentials.consumer_key.as_str(),
            credentials.consumer_secret.as_str(),
        );
        let transport = ReqwestClient::builder().redirect(Policy::none()).build()?;

        let request_token = self.request_token(&transport, &consumer)?;
        self.trace("request token generated");

        let verifier = self.authorize(&transport, &request_token)?;
        self.trace("login accepted");

        let access_token = self.access_token(&transport, consumer.clone(), request_token, verifier)?;
        self.trace("access token generated");

        let domain = normalize_domain(&credentials.domain);
        let jar = Arc::new(Jar::default());
        let (cookie, cookie_url) = access_cookie(&domain, &access_token.oauth_token)?;
        jar.add_cookie_str(&cookie, &cookie_url);
        self.trace("access token cookie set");

        let secrets = consumer.token(access_token.oauth_token, access_token.oauth_token_secret);
        let signer = Signer::new(
            secrets,
            OAuthParameters::new().realm(credentials.realm.as_str()),
        );
        let session = Session::authenticated(signer, jar)?;
        self.trace("session created");

        Ok(Client::new(domain, credentials.realm.clone(), session))
    }

    fn request_token(
        &self,
        transport: &ReqwestClient,
        consumer: &Secrets<()>,
    ) -> Result<TokenResponse> {
        let url = Url::parse(&self.endpoints.request_token)?;
        let params = self.oauth_parameters().callback(CALLBACK);
        let authorization = sign_post(consumer, params, &url);

        transport
            .post(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .parse_oauth_token()
            .map_err(|e| Error::Handshake(TokenKind::RequestToken, e))
    }

    /// Submits the account login and extracts `oauth_verifier`.
    fn authorize(&self, transport: &ReqwestClient, request_token: &TokenResponse) -> Result<String> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        url.query_pairs_mut()
            .append_pair(OAUTH_TOKEN_KEY, &request_token.oauth_token);
        let form = [
            ("email", self.credentials.email.as_str()),
            ("password", self.credentials.password.as_str()),
            (OAUTH_TOKEN_KEY, request_token.oauth_token.as_str()),
        ];

        // the response is dropped, and its connection released, on every path
        let response = transport.post(url).form(&form).send()?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(Error::Authentication(status));
        }
        let headers = response.headers().clone();
        let body = response.text()?;

        read_oauth_verifier(&headers, &body).map_err(Error::Protocol)
    }

    fn access_token(
        &self,
        transport: &ReqwestClient,
        consumer: Secrets<()>,
        request_token: TokenResponse,
        verifier: String,
    ) -> Result<TokenResponse> {
        let url = Url::parse(&self.endpoints.access_token)?;
        let secrets = consumer.token(request_token.oauth_token, request_token.oauth_token_secret);
        let params = self.oauth_parameters().verifier(verifier);
        let authorization = sign_post(&secrets, params, &url);

        transport
            .post(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .parse_oauth_token()
            .map_err(|e| Error::Handshake(TokenKind::AccessToken, e))
    }

    fn oauth_parameters(&self) -> OAuthParameters {
        OAuthParameters::new().realm(self.credentials.realm.as_str())
    }

    fn trace(&self, step: &'static str) {
        if self.debug {
            tracing::trace!(domain = %self.credentials.domain, step, "ox3 handshake");
        }
    }
}

fn sign_post<T>(secrets: &T, params: OAuthParameters, url: &Url) -> String
where
    T: SecretsProvider + Clone,
{
    Signer::new(secrets.clone(), params).generate_signature(&Method::POST, url.clone(), "", false)
}

/// The access-token cookie and the URL it is stored against.
///
/// The cookie is scoped to the bare host (no port) and set from the `www.`
/// origin, so it is sent to the apex domain and its subdomains.
fn access_cookie(domain: &str, token: &str) -> Result<(String, Url)> {
    // IP literals have no www. form
    let url = Url::parse(&format!("{}://www.{}/", DEFAULT_SCHEME, domain))
        .or_else(|_| Url::parse(&format!("{}://{}/", DEFAULT_SCHEME, domain)))?;
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_else(|| domain.to_string());
    let cookie = format!(
        "{}={}; Path=/; Domain={}",
        ACCESS_TOKEN_COOKIE, token, host
    );
    Ok((cookie, url))
}

#[cfg(test)]
mod tests {
    use reqwest::cookie::CookieStore;

    use super::*;

    #[test]
    fn default_endpoints_point_at_openx_sso() {
        let endpoints = SsoEndpoints::default();
        assert_eq!(endpoints.request_token, "https://sso.openx.com/api/index/initiate");
        assert_eq!(endpoints.authorize, "https://sso.openx.com/login/process");
        assert_eq!(endpoints.access_token, "https://sso.openx.com/api/index/token");
    }

    #[test]
    fn cookie_scoped_to_host() {
        let (cookie, url) = access_cookie("example.com", "tok").unwrap();
        assert_eq!(cookie, "openx3_access_token=tok; Path=/; Domain=example.com");
        assert_eq!(url.as_str(), "http://www.example.com/");
    }

    #[test]
    fn cookie_domain_drops_port() {
        let (cookie, url) = access_cookie("localhost:8080", "tok").unwrap();
        assert_eq!(cookie, "openx3_access_token=tok; Path=/; Domain=localhost");
        assert_eq!(url.as_str(), "http://www.localhost:8080/");
    }

    #[test]
    fn jar_holds_one_cookie_for_the_domain_only() {
        let jar = Jar::default();
        let (cookie, url) = access_cookie("example.com", "access-token").unwrap();
        jar.add_cookie_str(&cookie, &url);

        let sent = |raw: &str| {
            jar.cookies(&Url::parse(raw).unwrap())
                .map(|v| v.to_str().unwrap().to_string())
        };
        assert_eq!(
            sent("http://example.com/ox/4.0/adunit").as_deref(),
            Some("openx3_access_token=access-token")
        );
        assert_eq!(
            sent("http://api.example.com/").as_deref(),
            Some("openx3_access_token=access-token")
        );
        assert!(sent("http://other.com/").is_none());
        assert!(sent("http://notexample.com/").is_none());
    }

    #[test]
    fn blank_field_fails_before_network() {
        // unroutable endpoints: reaching the network would surface a transport error
        let endpoints = SsoEndpoints {
            request_token: "http://127.0.0.1:9/initiate".into(),
            authorize: "http://127.0.0.1:9/login".into(),
            access_token: "http://127.0.0.1:9/token".into(),
        };
        let credentials = Credentials::new("example.com", "realm", "key", "secret", "", "pw");
        let result = Handshake::new(&credentials).endpoints(endpoints).establish();
        assert!(matches!(result, Err(Error::Validation("email"))));
    }
}
