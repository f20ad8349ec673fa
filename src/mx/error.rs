use thiserror::Error;

/// Failure to build the system resolver. Per-domain lookup failures are
/// [`ResolutionError`]s and never surface past [`MxResolver`](super::MxResolver).
#[derive(Debug, Error)]
pub enum MxError {
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
}

impl MxError {
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }
}

/// Closed set of reasons an MX lookup can come back without hosts.
///
/// Every variant is treated the same way by the resolver: the domain maps to
/// an empty host list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The domain exists but publishes no MX records.
    #[error("no MX answer")]
    NoAnswer,
    /// The domain has an empty or malformed label and was never queried.
    #[error("empty or malformed domain label")]
    EmptyLabel,
    #[error("domain does not exist")]
    NxDomain,
    /// No nameserver could be reached (or all of them refused to answer).
    #[error("no nameservers available")]
    NoNameservers,
    #[error("lookup failed: {0}")]
    Other(String),
}

impl ResolutionError {
    pub(crate) fn other<T: std::fmt::Display>(err: T) -> Self {
        Self::Other(err.to_string())
    }
}
