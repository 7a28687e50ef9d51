//! Sticky rotation over an ordered set of API credentials.

use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::error::{Error, FetchError};

/// An opaque API token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Holds the credentials and the index of the active one.
///
/// The index survives across calls: after a failure the next operation starts
/// from the credential that last worked, not from the first one.
#[derive(Debug)]
pub struct CredentialRotator {
    credentials: Vec<Credential>,
    active: usize,
}

impl CredentialRotator {
    pub fn new(credentials: Vec<Credential>) -> Result<Self, Error> {
        if credentials.is_empty() {
            return Err(Error::Config("at least one API key is required".into()));
        }
        Ok(Self {
            credentials,
            active: 0,
        })
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    fn advance(&mut self) {
        self.active = (self.active + 1) % self.credentials.len();
    }

    /// Runs `op` with the active credential, rotating on failure until every
    /// credential has been tried once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] carrying the last [`FetchError`] when a full
    /// cycle fails.
    pub async fn with_active_credential<T, F, Fut>(&mut self, mut op: F) -> Result<T, Error>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.credentials.len();
        let mut attempt = 1;

        loop {
            let credential = self.credentials[self.active].clone();
            match op(credential).await {
                Ok(value) => {
                    debug!(credential = self.active, attempt, "Upstream call succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(
                        credential = self.active,
                        attempt,
                        attempts,
                        error = %err,
                        "Upstream call failed, rotating credential"
                    );
                    self.advance();
                    if attempt == attempts {
                        return Err(Error::Auth {
                            attempts,
                            last: err,
                        });
                    }
                    attempt += 1;
                }
            }
        }
    }
}
