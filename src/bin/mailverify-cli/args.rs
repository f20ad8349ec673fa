use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use mailverify_lib::{DEFAULT_PORTS, ProbeOptions};

#[derive(Parser)]
#[command(name = "mailverify-cli", version, about)]
pub struct Cli {
    /// fichier d'adresses (une par ligne)
    pub input: PathBuf,

    /// rapport CSV/NDJSON (stdout si absent)
    pub output: Option<PathBuf>,

    /// format: csv|ndjson
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// nombre d'adresses vérifiées en parallèle
    #[arg(long, short = 'j', default_value_t = 1)]
    pub jobs: usize,

    /// nom annoncé dans HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// enveloppe MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// port SMTP à essayer, dans l'ordre (répétable, défaut 25, 465, 587)
    #[arg(long = "port")]
    pub ports: Vec<u16>,

    /// timeout de connexion TCP (ms)
    #[arg(long = "connect-timeout-ms", default_value_t = 5_000)]
    pub connect_timeout_ms: u64,

    /// timeout lecture/écriture SMTP (ms)
    #[arg(long = "timeout-ms", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// timeout des requêtes DNS (ms)
    #[arg(long = "dns-timeout-ms", default_value_t = 5_000)]
    pub dns_timeout_ms: u64,

    /// verbosité des logs (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn probe_options(&self) -> Result<ProbeOptions> {
        let mut options = ProbeOptions::default();
        if let Some(helo) = &self.helo {
            options.helo_name = helo.clone();
        }
        if let Some(mail_from) = &self.mail_from {
            options.mail_from = mail_from.clone();
        }
        options.ports = if self.ports.is_empty() {
            DEFAULT_PORTS.to_vec()
        } else {
            self.ports.clone()
        };
        options.connect_timeout = millis("--connect-timeout-ms", self.connect_timeout_ms)?;
        options.io_timeout = millis("--timeout-ms", self.timeout_ms)?;
        Ok(options)
    }

    pub fn dns_timeout(&self) -> Result<Duration> {
        millis("--dns-timeout-ms", self.dns_timeout_ms)
    }

    pub fn jobs(&self) -> Result<NonZeroUsize> {
        match NonZeroUsize::new(self.jobs) {
            Some(jobs) => Ok(jobs),
            None => bail!("--jobs doit être >= 1"),
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

// un timeout nul désactiverait la borne (et TcpStream le refuse)
fn millis(flag: &str, value: u64) -> Result<Duration> {
    if value == 0 {
        bail!("{flag} doit être > 0");
    }
    Ok(Duration::from_millis(value))
}
