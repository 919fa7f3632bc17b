use std::{convert::TryFrom, sync::Arc};

use http::{header::AUTHORIZATION, Method};
use reqwest::{
    blocking::{Body, Client as ReqwestClient, RequestBuilder as ReqwestRequestBuilder, Response},
    cookie::{CookieStore, Jar},
    header::{HeaderName, HeaderValue},
    Url,
};
use serde::Serialize;

use crate::{Secrets, Signer};

/// Signer for a logged-in session: consumer plus access token.
pub(crate) type SessionSigner = Signer<Secrets<String>>;

/// Transport state behind a [`Client`](crate::Client).
///
/// An authenticated session holds the cookie jar carrying the access token and
/// a signer that adds an OAuth1 `Authorization` header to every request. An
/// anonymous session holds neither.
#[derive(Debug)]
pub(crate) struct Session {
    inner: ReqwestClient,
    signer: Option<SessionSigner>,
    jar: Option<Arc<Jar>>,
}

impl Session {
    pub(crate) fn authenticated(signer: SessionSigner, jar: Arc<Jar>) -> reqwest::Result<Self> {
        let inner = ReqwestClient::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Session {
            inner,
            signer: Some(signer),
            jar: Some(jar),
        })
    }

    /// A fresh transport with no cookies and no signer.
    pub(crate) fn anonymous() -> reqwest::Result<Self> {
        let inner = ReqwestClient::builder().build()?;
        Ok(Session {
            inner,
            signer: None,
            jar: None,
        })
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// The `Cookie` header this session would send to `url`.
    pub(crate) fn cookies(&self, url: &Url) -> Option<String> {
        self.jar
            .as_ref()?
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder<'_> {
        RequestBuilder {
            inner: self.inner.request(method.clone(), url.clone()),
            method,
            url,
            signer: self.signer.as_ref(),
            body: String::new(),
        }
    }
}

/// Wraps reqwest's builder so the OAuth1 signature can be computed from the
/// final URL and form body right before sending.
pub(crate) struct RequestBuilder<'a> {
    method: Method,
    inner: ReqwestRequestBuilder,
    signer: Option<&'a SessionSigner>,
    url: Url,
    body: String,
}

impl<'a> RequestBuilder<'a> {
    /// Set an opaque request body; it does not take part in the signature.
    pub(crate) fn body<T: Into<Body>>(mut self, body: T) -> Self {
        self.inner = self.inner.body(body);
        self
    }

    /// Send a form body; its pairs take part in the signature.
    pub(crate) fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        if let Ok(body) = serde_urlencoded::to_string(form) {
            self.body = body;
        }
        // on encoding failure reqwest reports the error from send()
        self.inner = self.inner.form(form);
        self
    }

    pub(crate) fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.inner = self.inner.header(key, value);
        self
    }

    /// Constructs the Request and sends it to the target URL.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending request,
    /// redirect loop was detected or redirect limit was exhausted.
    pub(crate) fn send(self) -> reqwest::Result<Response> {
        self.generate_signature().send()
    }

    /// Adds the OAuth1 `Authorization` header when the session has a signer.
    pub(crate) fn generate_signature(self) -> ReqwestRequestBuilder {
        let signer = match self.signer {
            Some(signer) => signer,
            None => return self.inner,
        };
        // query pairs and form pairs both enter the base string
        let (is_q, url, payload) = match self.url.query() {
            None | Some("") => (false, self.url.clone(), self.body.clone()),
            Some(q) => {
                let mut pure_url = self.url.clone();
                pure_url.set_query(None);
                let payload = if self.body.is_empty() {
                    q.to_string()
                } else {
                    format!("{}&{}", q, self.body)
                };
                (true, pure_url, payload)
            }
        };
        let signature = signer.generate_signature(&self.method, url, &payload, is_q);
        self.inner.header(AUTHORIZATION, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OAuthParameters;

    fn fixed_signer() -> SessionSigner {
        let secrets = Secrets::new("key", "secret").token("access", "access-secret");
        let params = OAuthParameters::new()
            .nonce("n0nce")
            .timestamp(1_600_000_000u64)
            .realm("realm");
        Signer::new(secrets, params)
    }

    fn signed_session() -> Session {
        let signer = fixed_signer();
        let jar = Arc::new(Jar::default());
        let url = Url::parse("http://www.example.com/").unwrap();
        jar.add_cookie_str("openx3_access_token=access; Path=/; Domain=example.com", &url);
        Session::authenticated(signer, jar).unwrap()
    }

    #[test]
    fn anonymous_sends_no_authorization() {
        let session = Session::anonymous().unwrap();
        let url = Url::parse("http://example.com/ox/4.0/adunit").unwrap();
        let request = session.request(Method::GET, url.clone()).generate_signature().build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert!(session.cookies(&url).is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn authenticated_signs_query_requests() {
        let session = signed_session();
        let url = Url::parse("http://example.com/ox/4.0/adunit?offset=0&limit=500").unwrap();
        let request = session.request(Method::GET, url.clone()).generate_signature().build().unwrap();
        let header = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_token=\"access\""));
        assert!(header.ends_with(",realm=\"realm\""));
        // the URL sent on the wire keeps its query
        assert_eq!(request.url(), &url);
    }

    #[test]
    fn form_body_is_captured() {
        let session = signed_session();
        let url = Url::parse("http://example.com/ox/4.0/lineitem").unwrap();
        let builder = session
            .request(Method::POST, url)
            .form(&[("name", "spring sale"), ("price", "1.5")]);
        assert_eq!(builder.body, "name=spring+sale&price=1.5");
    }

    #[test]
    fn form_to_url_with_query_signs_both() {
        let session = signed_session();
        let url = Url::parse("http://example.com/ox/4.0/lineitem?id=7").unwrap();
        let request = session
            .request(Method::POST, url)
            .form(&[("name", "spring sale")])
            .generate_signature()
            .build()
            .unwrap();
        let header = request.headers()[AUTHORIZATION].to_str().unwrap();

        let bare = Url::parse("http://example.com/ox/4.0/lineitem").unwrap();
        let signer = fixed_signer();
        let both = signer.generate_signature(&Method::POST, bare.clone(), "id=7&name=spring+sale", true);
        let query_only = signer.generate_signature(&Method::POST, bare, "id=7", true);
        assert_eq!(header, both);
        assert_ne!(header, query_only);
    }

    #[test]
    fn cookie_visible_for_api_origin() {
        let session = signed_session();
        let cookies = session
            .cookies(&Url::parse("http://example.com/ox/4.0/").unwrap())
            .unwrap();
        assert_eq!(cookies, "openx3_access_token=access");
        assert!(session
            .cookies(&Url::parse("http://other.org/").unwrap())
            .is_none());
    }
}
