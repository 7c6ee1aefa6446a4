//! TLS agent options.

use reqwest::{Certificate, ClientBuilder, Identity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// PEM encoded TLS material handed to the underlying client.
///
/// `cert` and `key` together form the client identity used for mutual TLS.
/// `ca` is added as an extra trusted root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Client certificate chain.
    pub cert: Option<String>,
    /// Private key matching `cert`.
    pub key: Option<String>,
    /// Additional certificate authority.
    pub ca: Option<String>,
}

/// Error building a [`ReqwestTransport`](crate::ReqwestTransport).
#[derive(Debug, Error)]
pub enum BuildError {
    /// Only one half of the client identity was supplied.
    #[error("agent options need both `cert` and `key` for a client identity")]
    IncompleteIdentity,

    /// The certificate and key could not be parsed.
    #[error("invalid client identity: {0}")]
    Identity(#[source] reqwest::Error),

    /// The certificate authority could not be parsed.
    #[error("invalid certificate authority: {0}")]
    Certificate(#[source] reqwest::Error),

    /// The client itself failed to build.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl AgentOptions {
    /// `true` when no option is set.
    pub fn is_empty(&self) -> bool {
        self.cert.is_none() && self.key.is_none() && self.ca.is_none()
    }

    pub(crate) fn apply(&self, mut builder: ClientBuilder) -> Result<ClientBuilder, BuildError> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => {
                let mut pem = Vec::with_capacity(cert.len() + key.len() + 1);
                pem.extend_from_slice(cert.as_bytes());
                pem.push(b'\n');
                pem.extend_from_slice(key.as_bytes());
                let identity = Identity::from_pem(&pem).map_err(BuildError::Identity)?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => return Err(BuildError::IncompleteIdentity),
        }

        if let Some(ca) = &self.ca {
            let certificate =
                Certificate::from_pem(ca.as_bytes()).map_err(BuildError::Certificate)?;
            builder = builder.add_root_certificate(certificate);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_options() {
        let options: AgentOptions =
            serde_json::from_str(r#"{"ca": "-----BEGIN CERTIFICATE-----"}"#).unwrap();

        assert_eq!(options.ca.as_deref(), Some("-----BEGIN CERTIFICATE-----"));
        assert!(options.cert.is_none());
        assert!(!options.is_empty());
        assert!(AgentOptions::default().is_empty());
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let options = AgentOptions {
            cert: Some("cert".to_owned()),
            ..AgentOptions::default()
        };

        let error = options.apply(reqwest::Client::builder()).unwrap_err();

        assert!(matches!(error, BuildError::IncompleteIdentity));
    }

    #[test]
    fn unparseable_identity_is_rejected() {
        let options = AgentOptions {
            cert: Some("not a certificate".to_owned()),
            key: Some("not a key".to_owned()),
            ca: None,
        };

        let error = options.apply(reqwest::Client::builder()).unwrap_err();

        assert!(matches!(error, BuildError::Identity(_)));
    }
}
