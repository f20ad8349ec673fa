/// Returns the domain part of `address`: everything after the first `@`.
///
/// An address without `@` has no domain, which is reported as `None` rather
/// than an error. The returned slice may be empty (`"user@"`).
pub fn domain_of(address: &str) -> Option<&str> {
    address.split_once('@').map(|(_, domain)| domain)
}
