//! PostgreSQL connection URL construction.

use crate::error::{Error, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in URL credentials (matches URI component encoding).
const CREDENTIAL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parameters for a single PostgreSQL database connection.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConnection {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

impl PostgresConnection {
    /// Build the `postgres://` URL for these parameters.
    pub fn url(&self) -> Result<String> {
        build_postgres_url(self)
    }
}

/// Build `postgres://[user[:password]@]host[:port]/database`.
///
/// Credentials are percent-encoded; empty credentials are omitted. Host and
/// database are required.
pub fn build_postgres_url(conn: &PostgresConnection) -> Result<String> {
    let host = conn.host.trim();
    if host.is_empty() {
        return Err(Error::InvalidConnection(
            "postgres host must be provided to build a connection URL".to_string(),
        ));
    }
    let database = conn.database.trim();
    if database.is_empty() {
        return Err(Error::InvalidConnection(
            "postgres database name must be provided to build a connection URL".to_string(),
        ));
    }

    let username = conn.username.as_deref().unwrap_or_default();
    let password = conn.password.as_deref().unwrap_or_default();

    let mut url = String::from("postgres://");
    if !username.is_empty() || !password.is_empty() {
        url.extend(utf8_percent_encode(username, CREDENTIAL_ENCODE_SET));
        if !password.is_empty() {
            url.push(':');
            url.extend(utf8_percent_encode(password, CREDENTIAL_ENCODE_SET));
        }
        url.push('@');
    }
    url.push_str(host);
    if let Some(port) = conn.port {
        url.push(':');
        url.push_str(&port.to_string());
    }
    url.push('/');
    url.push_str(database);

    Ok(url)
}
