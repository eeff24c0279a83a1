use std::net::IpAddr;

/// Display name used when an address has no PTR record.
pub const PTR_NOT_FOUND: &str = "PTR record not found";

/// Turns a hop address into the name shown in reports. Called once per discovered hop.
pub trait HostNameResolver {
    fn reverse_lookup(&self, ip_addr: IpAddr) -> String;
}

impl<F> HostNameResolver for F
where
    F: Fn(IpAddr) -> String,
{
    fn reverse_lookup(&self, ip_addr: IpAddr) -> String {
        self(ip_addr)
    }
}

/// Reverse lookup through the system resolver (`getnameinfo`). Yields the single canonical name even when an
/// address has several PTR records; a resolver that reports all of them, joined with `,`, can be passed as a
/// closure instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct DnsHostNameResolver;

impl HostNameResolver for DnsHostNameResolver {
    fn reverse_lookup(&self, ip_addr: IpAddr) -> String {
        match dns_lookup::lookup_addr(&ip_addr) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("reverse lookup of {} failed: {}", ip_addr, e);
                PTR_NOT_FOUND.to_owned()
            }
        }
    }
}
