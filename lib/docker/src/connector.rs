use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::Uri;
use hyper::rt::ReadBufCursor;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tower::Service;

const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Where the Docker Engine API can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(DEFAULT_SOCKET))
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint::Tcp(addr.to_string())
    }
}

impl Endpoint {
    /// Parse a `DOCKER_HOST` style address, e.g. `unix:///var/run/docker.sock`
    /// or `tcp://10.0.0.1:2375`.
    pub fn parse(host: &str) -> Result<Self, String> {
        let host = host.trim();
        if host.is_empty() {
            return Ok(Endpoint::default());
        }

        let Some((scheme, rest)) = host.split_once("://") else {
            return Err(format!("docker host {host:?} has no scheme"));
        };

        match scheme {
            "unix" => {
                if rest.is_empty() {
                    return Err(format!("docker host {host:?} has no socket path"));
                }

                Ok(Endpoint::Unix(PathBuf::from(rest)))
            }
            "tcp" | "http" => {
                let authority = rest.trim_end_matches('/');
                if authority.is_empty() {
                    return Err(format!("docker host {host:?} has no address"));
                }

                Ok(Endpoint::Tcp(authority.to_string()))
            }
            _ => Err(format!("unsupported docker host scheme {scheme:?}")),
        }
    }

    /// Reads `DOCKER_HOST`, falling back to the default unix socket.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("DOCKER_HOST") {
            Ok(host) => Endpoint::parse(&host),
            Err(_) => Ok(Endpoint::default()),
        }
    }
}

pin_project! {
    #[project = StreamProj]
    pub enum Stream {
        Unix {
            #[pin]
            inner: tokio::net::UnixStream,
        },
        Tcp {
            #[pin]
            inner: tokio::net::TcpStream,
        },
    }
}

impl hyper::rt::Read for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.project() {
            StreamProj::Unix { inner } => {
                let mut io = TokioIo::new(inner);
                Pin::new(&mut io).poll_read(cx, buf)
            }
            StreamProj::Tcp { inner } => {
                let mut io = TokioIo::new(inner);
                Pin::new(&mut io).poll_read(cx, buf)
            }
        }
    }
}

impl hyper::rt::Write for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.project() {
            StreamProj::Unix { inner } => inner.poll_write(cx, buf),
            StreamProj::Tcp { inner } => inner.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        match self.project() {
            StreamProj::Unix { inner } => inner.poll_flush(cx),
            StreamProj::Tcp { inner } => inner.poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.project() {
            StreamProj::Unix { inner } => inner.poll_shutdown(cx),
            StreamProj::Tcp { inner } => inner.poll_shutdown(cx),
        }
    }
}

impl Connection for Stream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

/// Connects every request to the configured engine endpoint, the request
/// URI's authority is ignored.
#[derive(Clone)]
pub struct Connector(Endpoint);

impl Connector {
    pub fn new(endpoint: Endpoint) -> Self {
        Connector(endpoint)
    }
}

impl Service<Uri> for Connector {
    type Response = Stream;
    type Error = std::io::Error;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Uri) -> Self::Future {
        let endpoint = self.0.clone();

        Box::pin(async move {
            match endpoint {
                Endpoint::Unix(path) => {
                    let inner = tokio::net::UnixStream::connect(path).await?;
                    Ok(Stream::Unix { inner })
                }
                Endpoint::Tcp(addr) => {
                    let inner = tokio::net::TcpStream::connect(addr).await?;
                    inner.set_nodelay(true)?;
                    Ok(Stream::Tcp { inner })
                }
            }
        })
    }
}
