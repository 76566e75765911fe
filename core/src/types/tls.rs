use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How the server certificate is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTrust {
    /// Platform roots.
    SystemDefaults,
    /// Only the given CA bundle.
    CustomCa(PathBuf),
    /// No verification at all.
    Nothing,
}

/// Client certificate and trust anchor handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsConfig {
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
}

impl TlsConfig {
    pub fn new(certificate_path: Option<PathBuf>, ca_cert_path: Option<PathBuf>) -> Self {
        TlsConfig {
            certificate_path,
            ca_cert_path,
        }
    }

    pub fn client_certificate(&self) -> Option<&Path> {
        self.certificate_path.as_deref()
    }

    /// A client certificate without a CA means the cluster uses a
    /// self-signed setup: present the cert, skip server verification.
    pub fn server_trust(&self) -> ServerTrust {
        match (&self.certificate_path, &self.ca_cert_path) {
            (_, Some(ca)) => ServerTrust::CustomCa(ca.clone()),
            (Some(_), None) => ServerTrust::Nothing,
            (None, None) => ServerTrust::SystemDefaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_matrix() {
        let none = TlsConfig::default();
        assert_eq!(none.server_trust(), ServerTrust::SystemDefaults);

        let cert_only = TlsConfig::new(Some("/c.pem".into()), None);
        assert_eq!(cert_only.server_trust(), ServerTrust::Nothing);
        assert_eq!(cert_only.client_certificate(), Some(Path::new("/c.pem")));

        let both = TlsConfig::new(Some("/c.pem".into()), Some("/ca.pem".into()));
        assert_eq!(both.server_trust(), ServerTrust::CustomCa("/ca.pem".into()));

        let ca_only = TlsConfig::new(None, Some("/ca.pem".into()));
        assert_eq!(ca_only.server_trust(), ServerTrust::CustomCa("/ca.pem".into()));
        assert_eq!(ca_only.client_certificate(), None);
    }
}
