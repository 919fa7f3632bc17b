use std::fmt;

/// Supplies the key material an OAuth1 signature is computed from.
pub trait SecretsProvider {
    fn get_consumer_key_pair(&self) -> (&str, &str);

    fn get_token_pair_option(&self) -> Option<(&str, &str)>;

    fn get_token_option_pair(&self) -> (Option<&str>, Option<&str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or((None, None))
    }
}

/// Consumer key and secret, optionally paired with a token and token secret.
///
/// `Secrets<()>` is the bare consumer used to ask for a request token;
/// `Secrets<String>` additionally carries either the request token (during the
/// access-token exchange) or the access token (for the rest of the session).
/// Each handshake builds its own value; nothing is shared between handshakes.
#[derive(Clone)]
pub struct Secrets<T> {
    token: T,
    token_secret: T,
    consumer_key: String,
    consumer_secret: String,
}

impl Secrets<()> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Secrets {
            token: (),
            token_secret: (),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    pub fn token<TKey, TSecret>(self, token: TKey, token_secret: TSecret) -> Secrets<String>
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Secrets {
            token: token.into(),
            token_secret: token_secret.into(),
            consumer_key: self.consumer_key,
            consumer_secret: self.consumer_secret,
        }
    }
}

impl SecretsProvider for Secrets<()> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        None
    }
}

impl SecretsProvider for Secrets<String> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        Some((&self.token, &self.token_secret))
    }
}

// secrets never reach logs
impl<T> fmt::Debug for Secrets<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSUMER_KEY: &str = "<CONSUMER_KEY>";
    const CONSUMER_SECRET: &str = "<CONSUMER_SECRET>";
    const TOKEN: &str = "<ACCESS_TOKEN>";
    const TOKEN_SECRET: &str = "<TOKEN_SECRET>";

    #[test]
    fn consumer_only_has_no_token() {
        let secrets = Secrets::new(CONSUMER_KEY, CONSUMER_SECRET);
        assert_eq!(
            secrets.get_consumer_key_pair(),
            (CONSUMER_KEY, CONSUMER_SECRET)
        );
        assert_eq!(secrets.get_token_option_pair(), (None, None));
    }

    #[test]
    fn token_builder_keeps_consumer() {
        let secrets = Secrets::new(CONSUMER_KEY, CONSUMER_SECRET).token(TOKEN, TOKEN_SECRET);
        assert_eq!(
            secrets.get_consumer_key_pair(),
            (CONSUMER_KEY, CONSUMER_SECRET)
        );
        assert_eq!(secrets.get_token_pair_option(), Some((TOKEN, TOKEN_SECRET)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let secrets = Secrets::new(CONSUMER_KEY, CONSUMER_SECRET).token(TOKEN, TOKEN_SECRET);
        let printed = format!("{:?}", secrets);
        assert!(printed.contains(CONSUMER_KEY));
        assert!(!printed.contains(CONSUMER_SECRET));
        assert!(!printed.contains(TOKEN_SECRET));
    }
}
