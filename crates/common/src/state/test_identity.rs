use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::{anonymize_ip, ipv4_prefix, AgentSerial};

#[test]
fn serial_accepts_decimal_only() {
    assert!(AgentSerial::from_str("12345").is_ok());
    assert!(AgentSerial::from_str("340282366920938463463374607431768211456").is_ok());
    assert!(AgentSerial::from_str("").is_err());
    assert!(AgentSerial::from_str("0x1f").is_err());
    assert!(AgentSerial::from_str("12 34").is_err());
    assert!(AgentSerial::from_str("-5").is_err());
}

#[test]
fn serial_canonicalizes_leading_zeros() {
    assert_eq!(AgentSerial::from_str("0012345").unwrap().as_str(), "12345");
    assert_eq!(AgentSerial::from_str("000").unwrap().as_str(), "0");
    assert_eq!(
        AgentSerial::from_str("12345").unwrap(),
        AgentSerial::from_str("0012345").unwrap()
    );
}

#[test]
fn serial_serde_is_transparent() {
    let serial = AgentSerial::from_str("98765432109876543210").unwrap();
    let json = serde_json::to_string(&serial).unwrap();
    assert_eq!(json, "\"98765432109876543210\"");
    let back: AgentSerial = serde_json::from_str(&json).unwrap();
    assert_eq!(back, serial);
}

#[test]
fn anonymize_zeroes_last_octet() {
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 77));
    assert_eq!(ipv4_prefix(ip), "203.0.113");
    assert_eq!(anonymize_ip(ip), "203.0.113.0");
}

#[test]
fn anonymize_truncates_ipv6() {
    let ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0xbeef, 1, 2, 3, 4, 5));
    assert_eq!(anonymize_ip(ip), "2001:db8:beef::");
}
