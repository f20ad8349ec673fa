#![forbid(unsafe_code)]
//! mailverify_lib — audit de délivrabilité e-mail (MX + dialogue SMTP partiel)
//!
//! Pipeline: [`domain_of`] → [`MxResolver::resolve_mx`] → [`connect_host`] +
//! [`handshake`] per MX host → [`VerificationResult`]. [`Verifier`] wires the
//! pieces together; [`batch`] streams results for a whole address list.

pub mod address;
pub mod batch;
pub mod mx;
pub mod smtp;
pub mod verify;

pub use address::domain_of;
pub use batch::{BatchError, REPORT_HEADER, ReportWriter, read_addresses, run_batch};
pub use mx::{LookupMx, MxCache, MxError, MxHost, MxResolver, ResolutionError, system_resolver};
pub use smtp::{
    Connector, DEFAULT_PORTS, HandshakeError, HandshakeOutcome, ProbeOptions, SmtpStream, Stage,
    TcpConnector, connect_host, handshake, run_handshake,
};
pub use verify::{HostAttempt, NO_SERVERS, VerificationResult, Verifier};
