use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use super::connector::{Connector, SmtpStream, connect_host};
use super::{HandshakeError, ProbeOptions};

/// Position in the (strictly linear) probe conversation.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connecting,
    Banner,
    Helo,
    MailFrom,
    RcptTo,
    Done,
}

impl Stage {
    pub fn next(self) -> Self {
        match self {
            Self::Connecting => Self::Banner,
            Self::Banner => Self::Helo,
            Self::Helo => Self::MailFrom,
            Self::MailFrom => Self::RcptTo,
            Self::RcptTo | Self::Done => Self::Done,
        }
    }

    /// Reply codes that let the conversation advance past this stage.
    pub fn accepted_codes(self) -> &'static [&'static str] {
        match self {
            Self::Banner => &["220"],
            Self::Helo => &["250", "220"],
            Self::MailFrom | Self::RcptTo => &["250"],
            Self::Connecting | Self::Done => &[],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "CONNECT",
            Self::Banner => "HS",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Done => "DONE",
        })
    }
}

/// Result of probing one host for one recipient.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Accepted,
    Rejected(String),
}

impl HandshakeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Empty for [`Accepted`](Self::Accepted), the failure reason otherwise.
    pub fn diagnostic(&self) -> &str {
        match self {
            Self::Accepted => "",
            Self::Rejected(reason) => reason,
        }
    }
}

impl From<Result<(), HandshakeError>> for HandshakeOutcome {
    fn from(result: Result<(), HandshakeError>) -> Self {
        match result {
            Ok(()) => Self::Accepted,
            Err(err) => Self::Rejected(err.to_string()),
        }
    }
}

/// Probes `host` for `address` and classifies the outcome.
pub fn handshake<C: Connector>(
    connector: &C,
    options: &ProbeOptions,
    host: &str,
    address: &str,
) -> HandshakeOutcome {
    run_handshake(connector, options, host, address).into()
}

/// Banner, `HELO`, `MAIL FROM`, `RCPT TO`; each step reads one reply and
/// must see one of the stage's accepted codes.
pub fn run_handshake<C: Connector>(
    connector: &C,
    options: &ProbeOptions,
    host: &str,
    address: &str,
) -> Result<(), HandshakeError> {
    let (stream, _port) =
        connect_host(connector, host, &options.ports).ok_or(HandshakeError::Connection)?;
    let mut session = Session::new(stream, host, options.max_reply_len);

    session.step(None)?;
    session.step(Some(&options.helo_command()))?;
    session.step(Some(&options.mail_from_command()))?;
    session.step(Some(&format!("RCPT TO:<{address}>")))?;
    session.finish();
    Ok(())
}

struct Session<'a, S> {
    stream: S,
    host: &'a str,
    stage: Stage,
    buf: Vec<u8>,
}

impl<'a, S: SmtpStream> Session<'a, S> {
    fn new(stream: S, host: &'a str, max_reply_len: usize) -> Self {
        Self {
            stream,
            host,
            stage: Stage::Connecting,
            buf: vec![0; max_reply_len.max(3)],
        }
    }

    /// Advances one stage: sends `command` (if any), reads a single reply and
    /// checks its code.
    fn step(&mut self, command: Option<&str>) -> Result<(), HandshakeError> {
        self.stage = self.stage.next();
        tracing::debug!(host = self.host, stage = %self.stage, "handshake step");
        if let Some(command) = command {
            self.send(command)?;
        }
        let reply = self.read_reply()?;
        if reply_matches(&reply, self.stage.accepted_codes()) {
            Ok(())
        } else {
            Err(HandshakeError::rejected(self.stage, reply))
        }
    }

    fn send(&mut self, command: &str) -> Result<(), HandshakeError> {
        tracing::trace!(host = self.host, "C: {command}");
        let line = format!("{command}\r\n");
        self.stream
            .write_all(line.as_bytes())
            .map_err(HandshakeError::io(self.stage))?;
        self.stream.flush().map_err(HandshakeError::io(self.stage))
    }

    fn read_reply(&mut self) -> Result<String, HandshakeError> {
        let read = self
            .stream
            .read(&mut self.buf)
            .map_err(HandshakeError::io(self.stage))?;
        let reply = String::from_utf8_lossy(&self.buf[..read]).trim().to_string();
        tracing::trace!(host = self.host, "S: {reply}");
        Ok(reply)
    }

    fn finish(mut self) {
        self.stage = self.stage.next();
        tracing::debug!(host = self.host, stage = %self.stage, "recipient accepted");
        if let Err(err) = self.stream.close() {
            tracing::debug!(host = self.host, error = %err, "close failed");
        }
    }
}

/// Compares the fixed three-character code prefix against `codes`. Replies
/// shorter than a code never match.
pub(crate) fn reply_matches(reply: &str, codes: &[&str]) -> bool {
    reply.get(..3).is_some_and(|code| codes.contains(&code))
}
