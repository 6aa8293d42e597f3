//! Discovery of the IPv4 addresses a user would SSH to.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use nix::errno::Errno;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;

/// An IPv4 address bound to a named interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name, such as `wlan0`.
    pub interface: String,
    /// Address assigned to the interface.
    pub address: Ipv4Addr,
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.interface, self.address)
    }
}

/// Source of interface addresses; the system implementation uses
/// `getifaddrs(3)`.
pub trait AddressSource {
    /// Lists non-loopback IPv4 addresses on interfaces that are up.
    fn ipv4_addresses(&self) -> Result<Vec<InterfaceAddress>, Errno>;
}

/// Reads addresses from the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAddressSource;

impl AddressSource for SystemAddressSource {
    fn ipv4_addresses(&self) -> Result<Vec<InterfaceAddress>, Errno> {
        let mut addresses: Vec<InterfaceAddress> = getifaddrs()?
            .filter(|ifa| {
                ifa.flags.contains(InterfaceFlags::IFF_UP)
                    && !ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK)
            })
            .filter_map(|ifa| {
                let sin = ifa.address.as_ref()?.as_sockaddr_in().copied()?;
                Some(InterfaceAddress {
                    interface: ifa.interface_name,
                    address: *SocketAddrV4::from(sin).ip(),
                })
            })
            .collect();
        sort_by_priority(&mut addresses);
        Ok(addresses)
    }
}

/// Wireless first, then wired, then USB gadgets, then everything else.
#[must_use]
pub fn interface_priority(name: &str) -> u8 {
    if name.starts_with("wlan") {
        0
    } else if name.starts_with("eth") {
        1
    } else if name.starts_with("usb") {
        2
    } else {
        3
    }
}

/// Stable sort by [`interface_priority`], preserving kernel order within a tier.
pub fn sort_by_priority(addresses: &mut [InterfaceAddress]) {
    addresses.sort_by_key(|entry| interface_priority(&entry.interface));
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn entry(interface: &str, last: u8) -> InterfaceAddress {
        InterfaceAddress {
            interface: interface.to_owned(),
            address: Ipv4Addr::new(192, 168, 1, last),
        }
    }

    #[rstest]
    #[case("wlan0", 0)]
    #[case("eth1", 1)]
    #[case("usb0", 2)]
    #[case("enp3s0", 3)]
    #[case("w", 3)]
    fn ranks_interfaces(#[case] name: &str, #[case] rank: u8) {
        assert_eq!(interface_priority(name), rank);
    }

    #[rstest]
    fn sort_is_stable_within_a_tier() {
        let mut addresses = vec![
            entry("usb0", 1),
            entry("eth0", 2),
            entry("wlan1", 3),
            entry("tun0", 4),
            entry("wlan0", 5),
        ];
        sort_by_priority(&mut addresses);
        let names: Vec<&str> = addresses.iter().map(|entry| entry.interface.as_str()).collect();
        assert_eq!(names, ["wlan1", "wlan0", "eth0", "usb0", "tun0"]);
    }

    #[rstest]
    fn formats_interface_and_address() {
        assert_eq!(entry("wlan0", 42).to_string(), "wlan0: 192.168.1.42");
    }
}
