use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Standard mail ports, in the order they are tried.
pub const DEFAULT_PORTS: [u16; 3] = [25, 465, 587];

/// Configuration knobs for the SMTP probe.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Identity announced in `HELO`.
    pub helo_name: String,
    /// Envelope sender used in `MAIL FROM`.
    pub mail_from: String,
    pub ports: Vec<u16>,
    pub connect_timeout: Duration,
    /// Read/write deadline applied to every SMTP exchange.
    pub io_timeout: Duration,
    /// Upper bound on the bytes read for a single reply.
    pub max_reply_len: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_name: "localhost".to_string(),
            mail_from: "mail@mail.com".to_string(),
            ports: DEFAULT_PORTS.to_vec(),
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(5),
            max_reply_len: 1024,
        }
    }
}

impl ProbeOptions {
    pub fn helo_command(&self) -> String {
        let name = self.helo_name.trim();
        if name.is_empty() {
            "HELO localhost".to_string()
        } else {
            format!("HELO {name}")
        }
    }

    pub fn mail_from_command(&self) -> String {
        format!("MAIL FROM:<{}>", self.mail_from)
    }
}
