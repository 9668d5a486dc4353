use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How to reach and authenticate to the server.
///
/// Built once at startup and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoint {
    /// Server host name or IPv4 address.  Also used as the TLS server name.
    pub address: String,
    pub port: u16,
    /// PEM client certificate chain presented to the server.
    pub certificate: PathBuf,
    /// PEM private key matching `certificate`.
    pub private_key: PathBuf,
    /// PEM bundle of CAs trusted to sign the server certificate.
    pub ca_bundle: PathBuf,
}

impl SessionEndpoint {
    /// `address:port`, as used for the TCP connect and in logs.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Reject endpoints that cannot possibly work before touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Config("endpoint address cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("endpoint port must be set".into()));
        }
        check_file("certificate", &self.certificate)?;
        check_file("private_key", &self.private_key)?;
        check_file("ca_bundle", &self.ca_bundle)?;
        Ok(())
    }
}

fn check_file(field: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{field} must name an existing file: {}",
            path.display()
        )))
    }
}
