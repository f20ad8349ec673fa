//! DNS MX resolution with a per-resolver memoization cache.
//!
//! The entry point is [`MxResolver::resolve_mx`]. Every failure class
//! ([`ResolutionError`]) is folded into an empty host list, so an empty
//! answer is the single "no delivery path" signal.

mod cache;
mod error;
mod resolver;
mod types;

pub use cache::MxCache;
pub use error::{MxError, ResolutionError};
pub use resolver::{LookupMx, MxResolver, system_resolver};
pub use types::MxHost;
