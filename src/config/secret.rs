//! Credential handling for configuration values
//!
//! The PostgreSQL connection string carries a password, so it is held in a
//! `secrecy::Secret`. The payload is zeroed on drop and only readable through
//! `expose_secret()`.

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// URL schemes accepted for PostgreSQL connection strings
const POSTGRES_SCHEMES: [&str; 2] = ["postgresql://", "postgres://"];

/// Plain-text credential wrapped by [`SecretString`]
#[derive(Clone, Zeroize, Serialize, Deserialize)]
#[serde(transparent)]
#[zeroize(drop)]
pub struct Credential(String);

impl CloneableSecret for Credential {}
impl DebugSecret for Credential {}
impl SerializableSecret for Credential {}

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// True for `postgresql://` and `postgres://` URLs
    pub fn is_postgres_url(&self) -> bool {
        POSTGRES_SCHEMES.iter().any(|scheme| self.0.starts_with(scheme))
    }
}

/// A zeroizing credential, redacted in `Debug`
pub type SecretString = Secret<Credential>;

/// Wraps a plain string as a [`SecretString`]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(Credential(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use test_case::test_case;

    #[test_case("postgresql://u:pw@host/db", true ; "long scheme")]
    #[test_case("postgres://u:pw@host/db", true ; "short scheme")]
    #[test_case("mysql://u:pw@host/db", false ; "other scheme")]
    #[test_case("host=localhost user=u", false ; "keyword form")]
    fn test_postgres_url_detection(value: &str, expected: bool) {
        let secret = secret_string(value.to_string());
        assert_eq!(secret.expose_secret().is_postgres_url(), expected);
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("postgresql://cifdb:hunter2@db/pdbx".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            connection_string: SecretString,
        }

        let section: Section = toml::from_str(r#"connection_string = "  ""#).unwrap();
        assert!(section.connection_string.expose_secret().is_blank());
        let section: Section =
            toml::from_str(r#"connection_string = "postgres://x""#).unwrap();
        assert_eq!(section.connection_string.expose_secret().as_str(), "postgres://x");
    }
}
