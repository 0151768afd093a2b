//! ASN metadata via Team Cymru's DNS zones: origin lookups map an address to
//! its announcing ASN, description lookups map an ASN to its human name.

use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;

use super::error::GeoError;

/// Query name for the origin zone: reversed octets for IPv4, nibbles for
/// IPv6.
fn origin_query(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.origin.asn.cymru.com.", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut name = String::new();
            for byte in v6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0xf, byte >> 4));
            }
            name.push_str("origin6.asn.cymru.com.");
            name
        }
    }
}

async fn first_txt(resolver: &TokioAsyncResolver, query: String) -> Result<String, GeoError> {
    let lookup = resolver.txt_lookup(query).await?;
    let record = lookup.iter().next().ok_or(GeoError::NoRecord)?;
    Ok(record
        .txt_data()
        .iter()
        .map(|data| String::from_utf8_lossy(data).into_owned())
        .collect::<Vec<_>>()
        .join(""))
}

/// The announcing ASN of an address, `AS15169` form.
///
/// Origin answers look like `15169 | 8.8.8.0/24 | US | arin | 2000-03-30`;
/// multi-origin prefixes list several ASNs in the first field, of which the
/// first is taken.
pub async fn origin_asn(resolver: &TokioAsyncResolver, ip: IpAddr) -> Result<String, GeoError> {
    let answer = first_txt(resolver, origin_query(ip)).await?;
    let asn = answer
        .split('|')
        .next()
        .and_then(|field| field.split_whitespace().next())
        .ok_or(GeoError::NoRecord)?;
    Ok(format!("AS{asn}"))
}

/// The registered description of an ASN, e.g. `GOOGLE, US`. Takes the
/// `AS15169` form; answers look like
/// `15169 | US | arin | 2000-03-30 | GOOGLE, US`.
pub async fn description(resolver: &TokioAsyncResolver, asn: &str) -> Result<String, GeoError> {
    let answer = first_txt(resolver, format!("{asn}.asn.cymru.com.")).await?;
    let name = answer.rsplit('|').next().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(GeoError::NoRecord);
    }
    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_queries_reverse_the_address() {
        assert_eq!(
            origin_query("8.8.8.8".parse().unwrap()),
            "8.8.8.8.origin.asn.cymru.com."
        );
        assert_eq!(
            origin_query("203.0.113.77".parse().unwrap()),
            "77.113.0.203.origin.asn.cymru.com."
        );
    }

    #[test]
    fn origin_queries_nibble_ipv6() {
        let name = origin_query("2001:db8::1".parse().unwrap());
        assert!(name.ends_with("origin6.asn.cymru.com."));
        // 32 nibble labels plus the four zone labels
        assert_eq!(name.matches('.').count(), 32 + 4);
        assert!(name.starts_with("1.0.0.0."));
        assert!(name.contains("8.b.d.0.1.0.0.2."));
    }
}
