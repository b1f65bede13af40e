//! Listener setup and serving for [`ConverterService`].
//!
//! Binds either a TCP address or a Unix domain socket, optionally wraps the
//! transport in TLS, and serves until the shutdown future resolves.

use crate::service::ConverterService;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{debug, info};

/// Transport used for the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Protocol {
    #[default]
    Tcp,
    /// Unix domain socket; the bind address is a filesystem path.
    Unix,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => Ok(Protocol::Tcp),
            "unix" => Ok(Protocol::Unix),
            other => Err(format!("unsupported protocol '{other}' (expected tcp or unix)")),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Unix => "unix",
        })
    }
}

/// PEM files for transport security.
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Where and how to listen.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub protocol: Protocol,
    /// `host:port` for TCP, socket path for Unix.
    pub bind: String,
    pub tls: Option<TlsFiles>,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Tcp,
            bind: "0.0.0.0:5000".to_string(),
            tls: None,
            max_message_bytes: crate::service::DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Errors raised while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to create listener on {protocol}://{bind}: {source}")]
    Bind {
        protocol: Protocol,
        bind: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read TLS file '{path}': {source}")]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unix sockets are not supported on this platform")]
    UnixUnsupported,

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
}

/// A bound, not yet serving, listener.
#[derive(Debug)]
pub enum Listener {
    Tcp(tokio::net::TcpListener),
    #[cfg(unix)]
    Unix {
        listener: tokio::net::UnixListener,
        path: PathBuf,
    },
}

impl Listener {
    /// Human-readable `protocol://address` of the bound socket.
    pub fn describe(&self) -> String {
        match self {
            Listener::Tcp(l) => match l.local_addr() {
                Ok(addr) => format!("tcp://{addr}"),
                Err(_) => "tcp://<unknown>".to_string(),
            },
            #[cfg(unix)]
            Listener::Unix { path, .. } => format!("unix://{}", path.display()),
        }
    }

    /// Local TCP address, if this is a TCP listener.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        match self {
            Listener::Tcp(l) => l.local_addr().ok(),
            #[cfg(unix)]
            Listener::Unix { .. } => None,
        }
    }
}

/// Create the listener described by `config`.
pub async fn bind(config: &ServerConfig) -> Result<Listener, ServerError> {
    debug!("creating listener on {}://{}", config.protocol, config.bind);
    match config.protocol {
        Protocol::Tcp => tokio::net::TcpListener::bind(&config.bind)
            .await
            .map(Listener::Tcp)
            .map_err(|e| bind_error(config, e)),
        #[cfg(unix)]
        Protocol::Unix => tokio::net::UnixListener::bind(&config.bind)
            .map(|listener| Listener::Unix {
                listener,
                path: PathBuf::from(&config.bind),
            })
            .map_err(|e| bind_error(config, e)),
        #[cfg(not(unix))]
        Protocol::Unix => Err(ServerError::UnixUnsupported),
    }
}

/// Bind according to `config` and serve `service` until `shutdown` resolves.
pub async fn serve(
    config: &ServerConfig,
    service: ConverterService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve_on(listener, config, service, shutdown).await
}

/// Serve `service` on an already bound listener until `shutdown` resolves.
///
/// `config.protocol` and `config.bind` are ignored; TLS and message limits apply.
pub async fn serve_on(
    listener: Listener,
    config: &ServerConfig,
    service: ConverterService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let mut builder = Server::builder().trace_fn(|_| tracing::info_span!("grpc_request"));

    if let Some(ref tls) = config.tls {
        debug!(cert = %tls.cert.display(), key = %tls.key.display(), "creating credentials");
        let identity = load_identity(tls).await?;
        builder = builder.tls_config(ServerTlsConfig::new().identity(identity))?;
    } else {
        debug!("creating server with insecure transport");
    }

    let router = builder.add_service(service.into_server(config.max_message_bytes));
    info!(
        "gRPC server listening on {} (tls: {})",
        listener.describe(),
        config.tls.is_some()
    );

    match listener {
        Listener::Tcp(l) => {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(l), shutdown)
                .await?
        }
        #[cfg(unix)]
        Listener::Unix { listener, path } => {
            let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);
            let served = router.serve_with_incoming_shutdown(incoming, shutdown).await;
            // The socket file outlives the listener; remove it so a restart can bind again.
            let _ = std::fs::remove_file(&path);
            served?
        }
    }

    info!("gRPC server stopped");
    Ok(())
}

async fn load_identity(tls: &TlsFiles) -> Result<Identity, ServerError> {
    let read = |path: PathBuf| async move {
        tokio::fs::read(&path)
            .await
            .map_err(|source| ServerError::TlsFile { path, source })
    };
    let cert = read(tls.cert.clone()).await?;
    let key = read(tls.key.clone()).await?;
    Ok(Identity::from_pem(cert, key))
}

fn bind_error(config: &ServerConfig, source: std::io::Error) -> ServerError {
    ServerError::Bind {
        protocol: config.protocol,
        bind: config.bind.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_protocols() {
        assert_eq!("tcp".parse::<Protocol>(), Ok(Protocol::Tcp));
        assert_eq!("TCP".parse::<Protocol>(), Ok(Protocol::Tcp));
        assert_eq!("unix".parse::<Protocol>(), Ok(Protocol::Unix));
        assert!("udp".parse::<Protocol>().is_err());
    }

    #[test]
    fn default_binds_all_interfaces_on_5000() {
        let config = ServerConfig::default();
        assert_eq!(config.protocol, Protocol::Tcp);
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert!(config.tls.is_none());
    }

    #[tokio::test]
    async fn bind_reports_local_tcp_address() {
        let config = ServerConfig {
            bind: "127.0.0.1:0".into(),
            ..ServerConfig::default()
        };
        let listener = bind(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.describe(), format!("tcp://{addr}"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn bind_creates_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converter.sock");
        let config = ServerConfig {
            protocol: Protocol::Unix,
            bind: path.to_string_lossy().into_owned(),
            ..ServerConfig::default()
        };
        let listener = bind(&config).await.unwrap();
        assert!(path.exists());
        assert!(listener.local_addr().is_none());
        assert!(listener.describe().starts_with("unix://"));
    }

    #[tokio::test]
    async fn bind_failure_names_the_address() {
        let config = ServerConfig {
            bind: "not-an-address".into(),
            ..ServerConfig::default()
        };
        let err = bind(&config).await.unwrap_err();
        assert!(err.to_string().contains("tcp://not-an-address"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_tls_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tls = TlsFiles {
            cert: dir.path().join("server.crt"),
            key: dir.path().join("server.key"),
        };
        let err = load_identity(&tls).await.unwrap_err();
        assert!(
            matches!(err, ServerError::TlsFile { ref path, .. } if path == &tls.cert),
            "got: {err}"
        );
    }
}
