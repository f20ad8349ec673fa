//! Partial SMTP dialogue used to probe a mailbox without sending mail.
//!
//! [`connect_host`] walks the configured ports, [`handshake`] runs the
//! banner/`HELO`/`MAIL FROM`/`RCPT TO` sequence and classifies the result as a
//! [`HandshakeOutcome`].

mod connector;
mod error;
mod handshake;
mod options;

pub use connector::{Connector, SmtpStream, TcpConnector, connect_host};
pub use error::HandshakeError;
pub use handshake::{HandshakeOutcome, Stage, handshake, run_handshake};
pub use options::{DEFAULT_PORTS, ProbeOptions};

#[cfg(test)]
pub(crate) mod tests;
