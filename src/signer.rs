use std::borrow::Cow;

use http::Method;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use url::Url;

use crate::{SecretsProvider, OAUTH_KEY_PREFIX, REALM_KEY};

/// Produces the `Authorization: OAuth ...` header value for a request.
///
/// The signer owns its secrets so that it can live inside a session for as
/// long as the session does.
#[derive(Debug, Clone)]
pub struct Signer<TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: TSecretsProvider,
    parameters: OAuthParameters,
}

impl<TSecretsProvider> Signer<TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: TSecretsProvider, parameters: OAuthParameters) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Signs `method url` with `payload` folded into the base string.
    ///
    /// `payload` is either the URL query (`is_url_query`) or a form-encoded
    /// body; pass an empty string for requests whose body is not a form.
    pub fn generate_signature(
        &self,
        method: &Method,
        url: Url,
        payload: &str,
        is_url_query: bool,
    ) -> String {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let options = self.parameters.build_options(token);

        // oauth1-request wants parameters in order, with the oauth_* block
        // emitted in one call: split the payload around the "oauth_" key.
        let parsed_payload: Vec<(Cow<str>, Cow<str>)> =
            url::form_urlencoded::parse(payload.as_bytes()).collect();
        let oauth_identifier = vec![(Cow::from(OAUTH_KEY_PREFIX), Cow::from(""))];
        let mut sorted_query = [parsed_payload, oauth_identifier].concat();
        sorted_query.sort();

        let mut divided = sorted_query.splitn(2, |(k, _)| k == OAUTH_KEY_PREFIX);
        let query_before_oauth = divided.next().unwrap_or_default();
        let query_after_oauth = divided.next().unwrap_or_default();

        let mut signer = if is_url_query {
            OAuthSigner::with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        } else {
            OAuthSigner::form_with_signature_method(
                HmacSha1,
                method.as_str(),
                url,
                consumer_secret,
                token_secret,
            )
        };

        for (key, value) in query_before_oauth {
            if !key.starts_with(OAUTH_KEY_PREFIX) {
                signer.parameter(key, value);
            }
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in query_after_oauth {
            if !key.starts_with(OAUTH_KEY_PREFIX) {
                signer.parameter(key, value);
            }
        }

        let sign = signer.finish().authorization;

        match self.parameters.realm {
            // OAuth oauth_...,realm="realm"
            Some(ref realm) => format!("{},{}=\"{}\"", sign, REALM_KEY, realm),
            None => sign,
        }
    }
}

/// Per-request `oauth_*` values that are not part of the secrets.
///
/// Nonce and timestamp are generated by oauth1-request when left unset.
#[derive(Debug, Clone, Default)]
pub struct OAuthParameters {
    callback: Option<String>,
    nonce: Option<String>,
    realm: Option<String>,
    timestamp: Option<u64>,
    verifier: Option<String>,
    version: bool,
}

impl OAuthParameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value
    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm appended to the Authorization header
    pub fn realm<T>(self, realm: T) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value
    ///
    /// # Note
    /// `true` sends `oauth_version="1.0"`, `false` omits the parameter.
    pub fn version(self, version: bool) -> Self {
        OAuthParameters { version, ..self }
    }

    fn build_options<'a>(&'a self, token: Option<&'a str>) -> Options<'a> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_str());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_str());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_str());
        }
        opt.version(self.version);

        opt
    }
}
