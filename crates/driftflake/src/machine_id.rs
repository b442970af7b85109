use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};

/// Derives a 16-bit machine identity from the host's private IPv4 address.
///
/// This is the default machine ID strategy: the third and fourth octets of
/// the first private IPv4 address found on a non-loopback interface, packed
/// as `octet3 << 8 | octet4`. Distinct hosts in the same /16 therefore map
/// to distinct identities.
///
/// # Errors
///
/// Returns [`Error::InterfaceEnumeration`] if interface addresses cannot be
/// listed, or [`Error::NoPrivateIpv4`] if no private IPv4 address exists.
pub fn lower_16_bit_private_ip() -> Result<u16> {
    let ip = private_ipv4()?;
    let octets = ip.octets();
    Ok(u16::from(octets[2]) << 8 | u16::from(octets[3]))
}

fn private_ipv4() -> Result<Ipv4Addr> {
    if_addrs::get_if_addrs()?
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(v4) if is_private_ipv4(v4) => Some(v4),
            _ => None,
        })
        .ok_or(Error::NoPrivateIpv4)
}

/// Returns true for addresses in the RFC 1918 ranges: `10.0.0.0/8`,
/// `172.16.0.0/12`, and `192.168.0.0/16`.
const fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    match octets[0] {
        10 => true,
        172 => octets[1] >= 16 && octets[1] < 32,
        192 => octets[1] == 168,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_private_ipv4;
    use std::net::Ipv4Addr;

    #[test]
    fn classifies_rfc1918_ranges() {
        assert!(is_private_ipv4(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(10, 255, 255, 255)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 31, 255, 255)));
        assert!(is_private_ipv4(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn rejects_public_and_adjacent_ranges() {
        assert!(!is_private_ipv4(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_private_ipv4(Ipv4Addr::new(172, 15, 0, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(172, 32, 0, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(192, 167, 0, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(127, 0, 0, 1)));
    }
}
