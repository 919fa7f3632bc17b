use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Error, Result, CONFIG_FILE_NAME};

/// Everything needed to log in to an OX3 instance.
///
/// The JSON form uses the key `consumer_secrect` (sic) so that config files
/// written for earlier clients keep working; `consumer_secret` is accepted
/// when reading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub domain: String,
    pub realm: String,
    pub consumer_key: String,
    #[serde(rename = "consumer_secrect", alias = "consumer_secret")]
    pub consumer_secret: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new<TDomain, TRealm, TKey, TSecret, TEmail, TPassword>(
        domain: TDomain,
        realm: TRealm,
        consumer_key: TKey,
        consumer_secret: TSecret,
        email: TEmail,
        password: TPassword,
    ) -> Self
    where
        TDomain: Into<String>,
        TRealm: Into<String>,
        TKey: Into<String>,
        TSecret: Into<String>,
        TEmail: Into<String>,
        TPassword: Into<String>,
    {
        Credentials {
            domain: domain.into(),
            realm: realm.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from a JSON config file.
    ///
    /// Only the file format is checked here; blank fields are reported by
    /// [`Credentials::validate`] when the handshake starts.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let credentials = serde_json::from_slice(&contents).map_err(|source| {
            ConfigError::Decode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(credentials)
    }

    /// Fails on the first field that is empty after trimming whitespace.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("domain", &self.domain),
            ("realm", &self.realm),
            ("consumer key", &self.consumer_key),
            ("consumer secret", &self.consumer_secret),
            ("email", &self.email),
            ("password", &self.password),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(Error::Validation(*name)),
            None => Ok(()),
        }
    }

    fn template() -> Self {
        Credentials::new(
            "enter domain",
            "enter realm",
            "enter key",
            "enter secrect key",
            "enter email",
            "enter password",
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("realm", &self.realm)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Writes a config file with placeholder values and returns where it went.
///
/// A path without a `.json` extension is taken as a directory and
/// `openx_config.json` is created inside it.
pub fn write_config_template<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path = match path.extension() {
        Some(ext) if ext == "json" => path.to_path_buf(),
        _ => path.join(CONFIG_FILE_NAME),
    };

    let write_error = |source: std::io::Error| ConfigError::Write {
        path: path.clone(),
        source,
    };
    let contents = serde_json::to_string_pretty(&Credentials::template())
        .map_err(|e| write_error(e.into()))?;
    fs::write(&path, contents).map_err(write_error)?;

    tracing::info!(path = %path.display(), "config template created");
    Ok(path)
}

/// Strips scheme, a leading `www.` and slashes so the result can serve both
/// as URL authority and as cookie domain.
pub(crate) fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    let mut domain = lowered.as_str();
    for scheme in &["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest;
            break;
        }
    }
    let domain = domain.trim_start_matches('/');
    let domain = domain.strip_prefix("www.").unwrap_or(domain);
    domain.split('/').next().unwrap_or_default().to_string()
}
