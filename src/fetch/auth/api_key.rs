use crate::error::FetchError;
use crate::fetch::client::HttpClient;
use crate::rotator::Credential;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects the active credential as an HTTP
/// header.
///
/// `header` is the header field to set (`x-api-key` for the GTFS-R feed,
/// `Ocp-Apim-Subscription-Key` for the journey planner). The header is
/// validated up front so a malformed credential fails like any other
/// transport error and gets rotated away.
pub struct ApiKey<C> {
    inner: C,
    header: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header: &str, credential: &Credential) -> Result<Self, FetchError> {
        let invalid = || FetchError::InvalidCredential {
            header: header.to_string(),
        };
        let header = HeaderName::from_bytes(header.as_bytes()).map_err(|_| invalid())?;
        let mut value = HeaderValue::from_str(credential.expose()).map_err(|_| invalid())?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header,
            value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_credential_with_newline() {
        let credential = Credential::new("abc\ndef");
        let result = ApiKey::new((), "x-api-key", &credential);
        assert!(matches!(
            result,
            Err(FetchError::InvalidCredential { header }) if header == "x-api-key"
        ));
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let credential = Credential::new("abc");
        assert!(ApiKey::new((), "bad header", &credential).is_err());
    }

    #[test]
    fn test_marks_value_sensitive() {
        let credential = Credential::new("secret");
        let auth = ApiKey::new((), "x-api-key", &credential).unwrap();
        assert!(auth.value.is_sensitive());
        assert_eq!(auth.header.as_str(), "x-api-key");
    }
}
