//! Transport seam and the mutual-TLS implementation used in production.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fl_domain::config::SessionEndpoint;
use fl_domain::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

/// Any bidirectional byte stream a [`Connection`](crate::Connection) can own.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub type BoxedStream = Box<dyn AsyncStream>;

/// Establishes an authenticated byte stream to the server.
///
/// Implementations return [`Error::Connect`] when the peer cannot be
/// reached or the handshake fails.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, endpoint: &SessionEndpoint) -> Result<BoxedStream>;
}

/// TCP + mutual TLS.  Certificates are loaded once at construction so
/// unreadable PEM files surface as [`Error::Config`] before any network
/// activity.
pub struct TlsTransport {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl TlsTransport {
    pub fn from_endpoint(endpoint: &SessionEndpoint) -> Result<Self> {
        let roots = load_roots(&endpoint.ca_bundle)?;
        let certs = load_certs(&endpoint.certificate)?;
        let key = load_key(&endpoint.private_key)?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Config(format!("tls protocol versions: {e}")))?
            .with_root_certificates(roots)
            .with_client_auth_cert(certs, key)
            .map_err(|e| Error::Config(format!("client certificate: {e}")))?;

        let server_name = ServerName::try_from(endpoint.address.as_str())
            .map_err(|e| Error::Config(format!("invalid server name {:?}: {e}", endpoint.address)))?
            .to_owned();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn connect(&self, endpoint: &SessionEndpoint) -> Result<BoxedStream> {
        let authority = endpoint.authority();

        let tcp = TcpStream::connect((endpoint.address.as_str(), endpoint.port))
            .await
            .map_err(|e| Error::Connect(format!("tcp connect to {authority}: {e}")))?;
        tcp.set_nodelay(true)
            .map_err(|e| Error::Connect(format!("configuring socket to {authority}: {e}")))?;

        let tls = self
            .connector
            .connect(self.server_name.clone(), tcp)
            .await
            .map_err(|e| Error::Connect(format!("tls handshake with {authority}: {e}")))?;

        tracing::debug!(authority = %authority, "tls session established");
        Ok(Box::new(tls))
    }
}

// ── PEM loading ─────────────────────────────────────────────────────

fn open_pem(what: &str, path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::Config(format!("opening {what} {}: {e}", path.display())))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = open_pem("certificate", path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("parsing certificate {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(Error::Config(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = open_pem("private key", path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Config(format!("parsing private key {}: {e}", path.display())))?
        .ok_or_else(|| Error::Config(format!("no private key found in {}", path.display())))
}

fn load_roots(path: &Path) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| Error::Config(format!("CA bundle {}: {e}", path.display())))?;
    }
    Ok(roots)
}
