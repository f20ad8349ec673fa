use std::sync::Arc;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf,
};

use super::{MxCache, MxError, MxHost, ResolutionError};

/// Source of raw MX answers. Implemented for the system [`Resolver`]; tests
/// plug in stubs.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolutionError>;
}

impl<L: LookupMx + ?Sized> LookupMx for &L {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolutionError> {
        (**self).lookup_mx(domain)
    }
}

impl<L: LookupMx + ?Sized> LookupMx for Arc<L> {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolutionError> {
        (**self).lookup_mx(domain)
    }
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolutionError> {
        let query = query_name(domain)?;
        let lookup = Resolver::mx_lookup(self, query.as_str()).map_err(classify)?;
        Ok(lookup
            .iter()
            .map(|mx| MxHost::new(normalize_exchange(&mx.exchange().to_utf8()), mx.preference()))
            .collect())
    }
}

/// MX resolution with per-domain memoization.
///
/// Lookup failures of every kind collapse to an empty host list; callers only
/// ever see "some hosts" or "no delivery path".
pub struct MxResolver<L> {
    lookup: L,
    cache: MxCache,
}

impl MxResolver<Resolver> {
    /// Builds a resolver from the system configuration, bounding each DNS
    /// query by `timeout`.
    pub fn from_system_conf(timeout: Duration) -> Result<Self, MxError> {
        system_resolver(timeout).map(Self::new)
    }
}

/// System-configured resolver whose queries give up after `timeout`. Shared
/// by MX lookups and the address lookups done before connecting.
pub fn system_resolver(timeout: Duration) -> Result<Resolver, MxError> {
    let (config, mut opts) = system_conf::read_system_conf().map_err(MxError::resolver_init)?;
    opts.timeout = timeout;
    Resolver::new(config, opts).map_err(MxError::resolver_init)
}

impl<L: LookupMx> MxResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self::with_cache(lookup, MxCache::new())
    }

    pub fn with_cache(lookup: L, cache: MxCache) -> Self {
        Self { lookup, cache }
    }

    pub fn cache(&self) -> &MxCache {
        &self.cache
    }

    /// Returns the MX hosts for `domain` in DNS answer order.
    ///
    /// `None` and `""` short-circuit to an empty list without touching DNS or
    /// the cache. Any other value is looked up at most once per resolver.
    pub fn resolve_mx(&self, domain: Option<&str>) -> Arc<[MxHost]> {
        let domain = match domain {
            Some(domain) if !domain.is_empty() => domain,
            _ => return Arc::from(Vec::new()),
        };

        self.cache.get_or_resolve(domain, || match self.lookup.lookup_mx(domain) {
            Ok(hosts) => {
                tracing::debug!(domain, count = hosts.len(), "resolved MX hosts");
                hosts
            }
            Err(err) => {
                tracing::debug!(domain, error = %err, "MX lookup yielded no hosts");
                Vec::new()
            }
        })
    }
}

/// Maps a resolver error onto the closed [`ResolutionError`] set.
pub(crate) fn classify(err: ResolveError) -> ResolutionError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => ResolutionError::NxDomain,
            ResponseCode::Refused | ResponseCode::ServFail => ResolutionError::NoNameservers,
            _ => ResolutionError::NoAnswer,
        },
        ResolveErrorKind::NoConnections => ResolutionError::NoNameservers,
        _ => ResolutionError::other(err),
    }
}

/// Prepares the name actually sent on the wire. The cache still keys on the
/// caller's original string.
pub(crate) fn query_name(domain: &str) -> Result<String, ResolutionError> {
    let trimmed = domain.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed.split('.').any(str::is_empty) {
        return Err(ResolutionError::EmptyLabel);
    }
    idna::domain_to_ascii(trimmed).map_err(|_| ResolutionError::EmptyLabel)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}
