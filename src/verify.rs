//! Per-address verification: domain → MX hosts → first host that accepts.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use trust_dns_resolver::Resolver;

use crate::address::domain_of;
use crate::mx::{LookupMx, MxError, MxResolver, system_resolver};
use crate::smtp::{Connector, HandshakeOutcome, ProbeOptions, TcpConnector, handshake};

/// Diagnostic recorded when no MX host accepted the recipient, including the
/// case where there were no hosts at all.
pub const NO_SERVERS: &str = "No email servers found";

/// One host tried while verifying an address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAttempt {
    pub host: String,
    pub outcome: HandshakeOutcome,
}

/// Final verdict for one input address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub address: String,
    pub valid: bool,
    /// Empty when `valid`.
    pub error: String,
    /// Hosts in the order they were tried. Not part of the CSV report.
    #[cfg_attr(feature = "with-serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub attempts: Vec<HostAttempt>,
}

impl VerificationResult {
    pub fn valid(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            valid: true,
            error: String::new(),
            attempts: Vec::new(),
        }
    }

    pub fn invalid(address: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            valid: false,
            error: error.into(),
            attempts: Vec::new(),
        }
    }

    fn with_attempts(mut self, attempts: Vec<HostAttempt>) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Runs the whole pipeline for single addresses.
///
/// Shared across worker threads by reference; the MX cache is the only state
/// that outlives a call to [`verify`](Self::verify).
pub struct Verifier<L, C> {
    resolver: MxResolver<L>,
    connector: C,
    options: ProbeOptions,
}

impl Verifier<Arc<Resolver>, TcpConnector> {
    /// System DNS resolver plus plain TCP, with timeouts taken from `options`
    /// and `dns_timeout`. MX and host address lookups share the resolver.
    pub fn system(options: ProbeOptions, dns_timeout: Duration) -> Result<Self, MxError> {
        let dns = Arc::new(system_resolver(dns_timeout)?);
        let connector =
            TcpConnector::new(Arc::clone(&dns), options.connect_timeout, options.io_timeout);
        Ok(Self::new(MxResolver::new(dns), connector, options))
    }
}

impl<L: LookupMx, C: Connector> Verifier<L, C> {
    pub fn new(resolver: MxResolver<L>, connector: C, options: ProbeOptions) -> Self {
        Self {
            resolver,
            connector,
            options,
        }
    }

    pub fn resolver(&self) -> &MxResolver<L> {
        &self.resolver
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Verifies `address`. Never fails: every problem ends up in the result's
    /// `error` field.
    pub fn verify(&self, address: &str) -> VerificationResult {
        let hosts = self.resolver.resolve_mx(domain_of(address));
        if hosts.is_empty() {
            tracing::debug!(address, "no MX hosts");
            return VerificationResult::invalid(address, NO_SERVERS);
        }

        let mut attempts = Vec::with_capacity(hosts.len());
        for host in hosts.iter() {
            let outcome = handshake(&self.connector, &self.options, &host.exchange, address);
            tracing::debug!(
                address,
                host = %host.exchange,
                accepted = outcome.is_accepted(),
                diagnostic = outcome.diagnostic(),
                "host attempt"
            );
            let accepted = outcome.is_accepted();
            attempts.push(HostAttempt {
                host: host.exchange.clone(),
                outcome,
            });
            if accepted {
                return VerificationResult::valid(address).with_attempts(attempts);
            }
        }

        VerificationResult::invalid(address, NO_SERVERS).with_attempts(attempts)
    }
}
