use std::convert::TryFrom;

use http::Method;
use reqwest::{
    blocking::{Body, Response},
    header::CONTENT_TYPE,
    Url,
};
use serde::Serialize;

use crate::session::Session;
use crate::{QueryParams, Result, ACCESS_TOKEN_COOKIE, API_PATH, DEFAULT_SCHEME};

const OPTIONS_PATH: &str = "/options";
const JSON_MEDIA_TYPE: &str = "application/json";

/// An authenticated OX3 API client.
///
/// Obtained from [`establish`](crate::establish) or
/// [`Handshake::establish`](crate::Handshake::establish). Every method resolves
/// its `path` below `http://<domain>/ox/4.0/`, performs one blocking round
/// trip and hands back the raw response; decoding is up to the caller.
///
/// Requests may be issued from several threads through `&Client`.
/// [`Client::log_off`] takes `&mut self`, so it cannot overlap with them.
#[derive(Debug)]
pub struct Client {
    domain: String,
    realm: String,
    scheme: &'static str,
    api_path: &'static str,
    session: Session,
}

impl Client {
    pub(crate) fn new(domain: String, realm: String, session: Session) -> Self {
        Client {
            domain,
            realm,
            scheme: DEFAULT_SCHEME,
            api_path: API_PATH,
            session,
        }
    }

    /// The normalized domain requests are sent to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// `false` once [`Client::log_off`] has been called.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The access-token cookie value attached to API requests, if any.
    pub fn access_cookie(&self) -> Option<String> {
        let url = self.api_root().ok()?;
        let cookies = self.session.cookies(&url)?;
        cookies.split("; ").find_map(|pair| {
            let mut kv = pair.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some(ACCESS_TOKEN_COOKIE), Some(value)) => Some(value.to_string()),
                _ => None,
            }
        })
    }

    /// Convenience method to make a `GET` request, with optional query
    /// parameters appended as `key=value` pairs.
    ///
    /// # Errors
    ///
    /// This method fails whenever supplied path cannot be resolved, or the
    /// request cannot be sent.
    pub fn get(&self, path: &str, params: Option<&QueryParams>) -> Result<Response> {
        let mut url = self.resolve_url(path)?;
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => {
                    format!("{}&{}", existing, params.encode())
                }
                _ => params.encode(),
            };
            url.set_query(Some(&query));
        }
        Ok(self.session.request(Method::GET, url).send()?)
    }

    /// `GET` with parameters taken from a JSON object of scalar values.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedParameter`](crate::Error::UnsupportedParameter)
    /// before anything is sent when a value is not a string, number or bool.
    pub fn get_with_json_params(&self, path: &str, params: &serde_json::Value) -> Result<Response> {
        let params = QueryParams::try_from(params)?;
        self.get(path, Some(&params))
    }

    /// Convenience method to make a `PUT` request; `body` is sent as is.
    pub fn put<B: Into<Body>>(&self, path: &str, body: B) -> Result<Response> {
        let url = self.resolve_url(path)?;
        Ok(self.session.request(Method::PUT, url).body(body).send()?)
    }

    /// Convenience method to make a `POST` request with a JSON content type.
    pub fn post<B: Into<Body>>(&self, path: &str, body: B) -> Result<Response> {
        let url = self.resolve_url(path)?;
        Ok(self
            .session
            .request(Method::POST, url)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .body(body)
            .send()?)
    }

    /// `POST` a form-urlencoded body built from `form`.
    pub fn post_form<T: Serialize + ?Sized>(&self, path: &str, form: &T) -> Result<Response> {
        let url = self.resolve_url(path)?;
        Ok(self.session.request(Method::POST, url).form(form).send()?)
    }

    /// Convenience method to make a `DELETE` request; `body` is sent as is.
    pub fn delete<B: Into<Body>>(&self, path: &str, body: B) -> Result<Response> {
        let url = self.resolve_url(path)?;
        Ok(self.session.request(Method::DELETE, url).body(body).send()?)
    }

    /// `GET` below the `/options` discovery endpoint.
    ///
    /// `"ad_category_options"` and `"/options/ad_category_options"` target
    /// the same URL; an empty path targets `/options` itself.
    pub fn options(&self, path: &str) -> Result<Response> {
        let path = if path.contains(OPTIONS_PATH) {
            path.to_string()
        } else {
            format!("{}/{}", OPTIONS_PATH, path)
        };
        self.get(&path, None)
    }

    /// Drops the cookies and OAuth1 credentials by swapping in a fresh,
    /// anonymous transport. Later calls reach the server unauthenticated.
    ///
    /// # Errors
    ///
    /// Fails when the new transport cannot be built; the current session is
    /// then left in place.
    pub fn log_off(&mut self) -> Result<()> {
        self.session = Session::anonymous()?;
        Ok(())
    }

    /// Resolves a logical endpoint path to the URL a request would target.
    ///
    /// Paths that already carry a scheme are returned untouched.
    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            if !url.cannot_be_a_base() {
                return Ok(url);
            }
        }
        let (path, query) = match path.find('?') {
            Some(idx) => (&path[..idx], Some(&path[idx + 1..])),
            None => (path, None),
        };
        let joined = join_path(&[&self.domain, self.api_path, path]);
        let mut url = Url::parse(&format!("{}://{}", self.scheme, joined))?;
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    fn api_root(&self) -> Result<Url> {
        self.resolve_url("")
    }
}

/// Joins segments with single slashes, dropping empty and `.` segments.
fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
