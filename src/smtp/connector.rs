use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use trust_dns_resolver::Resolver;

/// A byte stream an SMTP conversation can run over.
pub trait SmtpStream: Read + Write {
    /// Ends the conversation. Called once, after a successful handshake.
    fn close(&mut self) -> io::Result<()>;
}

impl SmtpStream for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Opens streams to a host. The host name is resolved once with
/// [`resolve`](Self::resolve), then each port is dialed against that answer.
pub trait Connector {
    type Stream: SmtpStream;
    type Addrs;

    fn resolve(&self, host: &str) -> io::Result<Self::Addrs>;

    fn connect(&self, addrs: &Self::Addrs, port: u16) -> io::Result<Self::Stream>;
}

impl<C: Connector + ?Sized> Connector for &C {
    type Stream = C::Stream;
    type Addrs = C::Addrs;

    fn resolve(&self, host: &str) -> io::Result<Self::Addrs> {
        (**self).resolve(host)
    }

    fn connect(&self, addrs: &Self::Addrs, port: u16) -> io::Result<Self::Stream> {
        (**self).connect(addrs, port)
    }
}

/// Plain TCP connector. Host lookups go through the DNS resolver (and its
/// timeout); each port gets one `connect_timeout` budget shared by every
/// address of the host, and the stream keeps `io_timeout` on reads and writes.
#[derive(Clone)]
pub struct TcpConnector {
    resolver: Arc<Resolver>,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl TcpConnector {
    pub fn new(resolver: Arc<Resolver>, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            resolver,
            connect_timeout,
            io_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;
    type Addrs = Vec<IpAddr>;

    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        let lookup = self.resolver.lookup_ip(host).map_err(io::Error::other)?;
        let addrs: Vec<IpAddr> = lookup.iter().collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no address for host",
            ));
        }
        Ok(addrs)
    }

    fn connect(&self, addrs: &Vec<IpAddr>, port: u16) -> io::Result<TcpStream> {
        let deadline = Instant::now() + self.connect_timeout;
        let mut last_err = None;
        for &ip in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_err = Some(io::Error::from(io::ErrorKind::TimedOut));
                break;
            }
            match TcpStream::connect_timeout(&SocketAddr::new(ip, port), remaining) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout))?;
                    stream.set_write_timeout(Some(self.io_timeout))?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        }))
    }
}

/// Resolves `host` once, then tries `ports` in order and returns the first
/// stream that connects, together with its port. `None` means the host is
/// unreachable.
pub fn connect_host<C: Connector>(
    connector: &C,
    host: &str,
    ports: &[u16],
) -> Option<(C::Stream, u16)> {
    let addrs = match connector.resolve(host) {
        Ok(addrs) => addrs,
        Err(err) => {
            tracing::debug!(host, error = %err, "host lookup failed");
            return None;
        }
    };
    for &port in ports {
        match connector.connect(&addrs, port) {
            Ok(stream) => {
                tracing::debug!(host, port, "connected");
                return Some((stream, port));
            }
            Err(err) => tracing::debug!(host, port, error = %err, "connect failed"),
        }
    }
    None
}
