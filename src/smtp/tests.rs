use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};

use super::{
    Connector, HandshakeOutcome, ProbeOptions, SmtpStream, TcpConnector, connect_host, handshake,
};

#[derive(Debug, Default)]
pub(crate) struct Log {
    pub resolutions: Vec<String>,
    pub attempts: Vec<(String, u16)>,
    pub sent: Vec<String>,
    pub closes: usize,
}

/// Connector whose hosts answer from canned reply scripts. Hosts without a
/// script, and refused ports, fail to connect; unresolvable hosts fail before
/// any port is dialed.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    scripts: HashMap<String, Vec<String>>,
    unresolvable: Vec<String>,
    refused_ports: Vec<u16>,
    fail_reads_after: Option<usize>,
    log: Arc<Mutex<Log>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host(mut self, host: &str, replies: &[&str]) -> Self {
        self.scripts.insert(
            host.to_string(),
            replies.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub(crate) fn unresolvable(mut self, host: &str) -> Self {
        self.unresolvable.push(host.to_string());
        self
    }

    pub(crate) fn refuse_port(mut self, port: u16) -> Self {
        self.refused_ports.push(port);
        self
    }

    pub(crate) fn fail_reads_after(mut self, reads: usize) -> Self {
        self.fail_reads_after = Some(reads);
        self
    }

    pub(crate) fn resolutions(&self) -> Vec<String> {
        self.log.lock().expect("log").resolutions.clone()
    }

    pub(crate) fn attempts(&self) -> Vec<(String, u16)> {
        self.log.lock().expect("log").attempts.clone()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.log.lock().expect("log").sent.clone()
    }

    pub(crate) fn closes(&self) -> usize {
        self.log.lock().expect("log").closes
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;
    type Addrs = String;

    fn resolve(&self, host: &str) -> io::Result<String> {
        self.log
            .lock()
            .expect("log")
            .resolutions
            .push(host.to_string());
        if self.unresolvable.iter().any(|h| h == host) {
            return Err(io::ErrorKind::NotFound.into());
        }
        Ok(host.to_string())
    }

    fn connect(&self, host: &String, port: u16) -> io::Result<ScriptedStream> {
        self.log
            .lock()
            .expect("log")
            .attempts
            .push((host.clone(), port));
        if self.refused_ports.contains(&port) {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }
        let script = self
            .scripts
            .get(host.as_str())
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))?;
        Ok(ScriptedStream {
            replies: script.iter().cloned().collect(),
            reads_left: self.fail_reads_after,
            pending: Vec::new(),
            log: Arc::clone(&self.log),
        })
    }
}

pub(crate) struct ScriptedStream {
    replies: VecDeque<String>,
    reads_left: Option<usize>,
    pending: Vec<u8>,
    log: Arc<Mutex<Log>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(left) = self.reads_left.as_mut() {
            if *left == 0 {
                return Err(io::ErrorKind::TimedOut.into());
            }
            *left -= 1;
        }
        let Some(reply) = self.replies.pop_front() else {
            return Ok(0);
        };
        let len = reply.len().min(buf.len());
        buf[..len].copy_from_slice(&reply.as_bytes()[..len]);
        Ok(len)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.windows(2).position(|w| w == b"\r\n") {
            let line: Vec<u8> = self.pending.drain(..pos + 2).collect();
            let line = String::from_utf8_lossy(&line[..pos]).into_owned();
            self.log.lock().expect("log").sent.push(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SmtpStream for ScriptedStream {
    fn close(&mut self) -> io::Result<()> {
        self.log.lock().expect("log").closes += 1;
        Ok(())
    }
}

#[test]
fn first_port_success_stops_the_walk() {
    let connector = ScriptedConnector::new().host("clarete.li", &[]);
    let (_, port) = connect_host(&connector, "clarete.li", &[25, 465, 587]).expect("connects");
    assert_eq!(port, 25);
    assert_eq!(connector.attempts(), [("clarete.li".to_string(), 25)]);
}

#[test]
fn falls_through_to_next_port() {
    let connector = ScriptedConnector::new()
        .host("clarete.li", &[])
        .refuse_port(25);
    let (_, port) = connect_host(&connector, "clarete.li", &[25, 465, 587]).expect("connects");
    assert_eq!(port, 465);
    assert_eq!(
        connector.attempts(),
        [
            ("clarete.li".to_string(), 25),
            ("clarete.li".to_string(), 465)
        ]
    );
}

#[test]
fn all_ports_failing_is_unreachable() {
    let connector = ScriptedConnector::new();
    assert!(connect_host(&connector, "clarete.li", &[25, 465, 587]).is_none());
    let ports: Vec<u16> = connector.attempts().into_iter().map(|(_, p)| p).collect();
    assert_eq!(ports, [25, 465, 587]);
}

#[test]
fn host_is_looked_up_once_for_the_whole_port_walk() {
    let connector = ScriptedConnector::new()
        .host("clarete.li", &[])
        .refuse_port(25)
        .refuse_port(465);
    let (_, port) = connect_host(&connector, "clarete.li", &[25, 465, 587]).expect("connects");
    assert_eq!(port, 587);
    assert_eq!(connector.resolutions(), ["clarete.li"]);
    assert_eq!(connector.attempts().len(), 3);
}

#[test]
fn unresolvable_host_is_never_dialed() {
    let connector = ScriptedConnector::new()
        .host("gone.clarete.li", &["220 hi"])
        .unresolvable("gone.clarete.li");
    let outcome = handshake(
        &connector,
        &ProbeOptions::default(),
        "gone.clarete.li",
        "lincoln@clarete.li",
    );
    assert_eq!(outcome.diagnostic(), "Connection Error");
    assert_eq!(connector.resolutions(), ["gone.clarete.li"]);
    assert!(connector.attempts().is_empty());
}

fn tcp_connector(options: &ProbeOptions) -> TcpConnector {
    let dns = Resolver::new(ResolverConfig::default(), ResolverOpts::default()).expect("resolver");
    TcpConnector::new(Arc::new(dns), options.connect_timeout, options.io_timeout)
}

#[test]
fn ip_literal_skips_dns() {
    let connector = tcp_connector(&ProbeOptions::default());
    let addrs = connector.resolve("127.0.0.1").expect("literal");
    assert_eq!(addrs, [IpAddr::V4(Ipv4Addr::LOCALHOST)]);
}

/// One SMTP turn on the loopback peer: wait for a command starting with the
/// prefix (none for the banner), then answer with the reply line.
type Turn = (Option<&'static str>, &'static str);

/// Serves a single connection from `turns` and returns the commands it read.
fn serve_once(turns: Vec<Turn>) -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        let Ok((mut stream, _)) = listener.accept() else {
            return received;
        };
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        for (prefix, reply) in turns {
            if let Some(prefix) = prefix {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                assert!(line.starts_with(prefix), "expected '{prefix}', got '{line}'");
                received.push(line);
            }
            if stream.write_all(format!("{reply}\r\n").as_bytes()).is_err() {
                break;
            }
        }
        received
    });
    (port, handle)
}

fn loopback_options(port: u16) -> ProbeOptions {
    ProbeOptions {
        ports: vec![port],
        connect_timeout: Duration::from_secs(2),
        io_timeout: Duration::from_secs(2),
        ..ProbeOptions::default()
    }
}

fn probe_loopback(turns: Vec<Turn>) -> (HandshakeOutcome, Vec<String>) {
    let (port, handle) = serve_once(turns);
    let options = loopback_options(port);
    let outcome = handshake(
        &tcp_connector(&options),
        &options,
        "127.0.0.1",
        "user@example.com",
    );
    (outcome, handle.join().expect("server thread"))
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn tcp_handshake_accepts_recipient() {
    let (outcome, received) = probe_loopback(vec![
        (None, "220 mock.example ESMTP"),
        (Some("HELO "), "250 mock.example"),
        (Some("MAIL FROM:"), "250 2.1.0 Ok"),
        (Some("RCPT TO:"), "250 2.1.5 Ok"),
    ]);
    assert_eq!(outcome, HandshakeOutcome::Accepted);
    assert_eq!(
        received,
        [
            "HELO localhost",
            "MAIL FROM:<mail@mail.com>",
            "RCPT TO:<user@example.com>"
        ]
    );
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn tcp_handshake_reports_banner_rejection() {
    let (outcome, received) = probe_loopback(vec![(None, "554 no service here")]);
    assert_eq!(outcome.diagnostic(), "HS: 554 no service here");
    assert!(received.is_empty());
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn tcp_handshake_reports_rcpt_rejection() {
    let (outcome, received) = probe_loopback(vec![
        (None, "220 mock.example ESMTP"),
        (Some("HELO"), "250 mock.example"),
        (Some("MAIL FROM:"), "250 2.1.0 Ok"),
        (Some("RCPT TO:"), "550 5.1.1 User unknown"),
    ]);
    assert_eq!(outcome.diagnostic(), "RCPT TO: 550 5.1.1 User unknown");
    assert_eq!(received.len(), 3);
}

