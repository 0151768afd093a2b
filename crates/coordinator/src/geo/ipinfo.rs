use std::net::IpAddr;

use serde::Deserialize;

use super::error::GeoError;

#[derive(Debug, Deserialize)]
struct IpInfoBody {
    org: Option<String>,
}

/// Last-resort lookup against the ipinfo.io API. The `org` field carries
/// `AS15169 Google LLC`; split into the id and the description.
pub async fn lookup(
    client: &reqwest::Client,
    token: Option<&str>,
    ip: IpAddr,
) -> Result<(String, String), GeoError> {
    let mut url = format!("https://ipinfo.io/{ip}/json");
    if let Some(token) = token {
        url.push_str("?token=");
        url.push_str(token);
    }
    let body: IpInfoBody = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let org = body.org.ok_or(GeoError::NoRecord)?;
    let (asn, name) = org.split_once(' ').ok_or(GeoError::NoRecord)?;
    if !asn.starts_with("AS") || asn.len() == 2 {
        return Err(GeoError::NoRecord);
    }
    Ok((asn.to_owned(), name.to_owned()))
}
