//! IP-to-ASN attribution from a layered set of sources.
//!
//! Two call sites with different shapes: enrichment during dispatch takes the
//! first source that answers ([`GeoResolver::lookup_asn`]), while the admin
//! lookup surface queries every source in parallel and reports each answer
//! independently ([`GeoResolver::lookup_all_by_ip`],
//! [`GeoResolver::lookup_all_by_asn`]).

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Serialize;
use tracing::warn;

pub mod cymru;
pub mod error;
pub mod ipinfo;
mod overrides;

pub use overrides::{AsnOverride, OverrideStore};

use error::{GeoError, OverrideError};

#[derive(Debug, Clone, Default)]
pub struct GeoConfig {
    /// Path to a GeoLite2-ASN style database; the offline source is disabled
    /// when unset.
    pub maxmind_db: Option<PathBuf>,
    /// Budget for each external source query.
    pub source_timeout: Duration,
    pub ipinfo_token: Option<String>,
}

pub struct GeoResolver {
    overrides: Option<OverrideStore>,
    maxmind: Option<maxminddb::Reader<Vec<u8>>>,
    resolver: TokioAsyncResolver,
    http: reqwest::Client,
    ipinfo_token: Option<String>,
    source_timeout: Duration,
}

impl GeoResolver {
    pub fn new(overrides: Option<OverrideStore>, config: GeoConfig) -> Result<Self, GeoError> {
        let maxmind = config
            .maxmind_db
            .as_deref()
            .map(maxminddb::Reader::open_readfile)
            .transpose()
            .map_err(GeoError::MaxmindOpen)?;

        let mut opts = ResolverOpts::default();
        opts.timeout = config.source_timeout;
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

        let http = reqwest::Client::builder()
            .timeout(config.source_timeout)
            .build()?;

        Ok(Self {
            overrides,
            maxmind,
            resolver,
            http,
            ipinfo_token: config.ipinfo_token,
            source_timeout: config.source_timeout,
        })
    }

    /// The override collection, when enabled.
    pub fn overrides(&self) -> Result<&OverrideStore, OverrideError> {
        self.overrides.as_ref().ok_or(OverrideError::Disabled)
    }

    /// Resolve an address to `(asn, as_name)` for enrichment: first source
    /// that answers wins, overrides correct the name. A miss never fails the
    /// enclosing probe; both fields come back empty.
    pub async fn lookup_asn(&self, ip: IpAddr) -> (Option<String>, Option<String>) {
        match self.cascade(ip).await {
            Ok((asn, name)) => (Some(asn), Some(name)),
            Err(e) => {
                warn!("failed to lookup ASN for {ip}: {e}");
                (None, None)
            }
        }
    }

    /// Enrichment that yields only the ASN id, for hop annotation.
    pub async fn lookup_asn_only(&self, ip: IpAddr) -> String {
        self.lookup_asn(ip).await.0.unwrap_or_default()
    }

    async fn cascade(&self, ip: IpAddr) -> Result<(String, String), GeoError> {
        let (asn, name) = match self.maxmind_lookup(ip) {
            Ok(found) => found,
            Err(_) => match self.cymru_lookup(ip).await {
                Ok(found) => found,
                Err(_) => ipinfo::lookup(&self.http, self.ipinfo_token.as_deref(), ip)
                    .await
                    .map_err(|_| GeoError::NoAnswer)?,
            },
        };
        Ok((asn.clone(), self.override_name(&asn).unwrap_or(name)))
    }

    fn override_name(&self, asn: &str) -> Option<String> {
        self.overrides
            .as_ref()
            .and_then(|store| store.lookup(asn).ok().flatten())
    }

    fn maxmind_lookup(&self, ip: IpAddr) -> Result<(String, String), GeoError> {
        let reader = self.maxmind.as_ref().ok_or(GeoError::MaxmindDisabled)?;
        let record: maxminddb::geoip2::Asn = reader.lookup(ip)?;
        let asn = record.autonomous_system_number.ok_or(GeoError::NoRecord)?;
        let name = record
            .autonomous_system_organization
            .unwrap_or_default()
            .to_owned();
        Ok((format!("AS{asn}"), name))
    }

    async fn cymru_lookup(&self, ip: IpAddr) -> Result<(String, String), GeoError> {
        let asn = cymru::origin_asn(&self.resolver, ip).await?;
        let name = cymru::description(&self.resolver, &asn)
            .await
            .unwrap_or_default();
        Ok((asn, name))
    }

    /// Admin lookup by address: every source queried in one concurrent
    /// round, each answer and error reported independently. Total latency is
    /// bounded by the slowest single source budget, not their sum.
    pub async fn lookup_all_by_ip(&self, ip: IpAddr) -> AsnLookupReport {
        let mut report = AsnLookupReport {
            ip: ip.to_string(),
            ..Default::default()
        };

        let maxmind = self.maxmind_lookup(ip);
        // the cymru chain (origin, then description) is held to one budget
        let cymru = tokio::time::timeout(self.source_timeout, async {
            let asn = cymru::origin_asn(&self.resolver, ip).await?;
            let name = cymru::description(&self.resolver, &asn).await?;
            Ok::<_, GeoError>((asn, name))
        });
        let ipinfo = ipinfo::lookup(&self.http, self.ipinfo_token.as_deref(), ip);
        let (cymru, ipinfo) = tokio::join!(cymru, ipinfo);
        let cymru = cymru.unwrap_or(Err(GeoError::Timeout));

        report.result.maxmind = source_slot(&maxmind);
        report.result.cymru = source_slot(&cymru);
        report.result.ipinfo = source_slot(&ipinfo);

        // the geoipdb slot keeps the cascade's policy: first source that
        // resolved an ASN wins, overrides correct the name
        let winner = [&maxmind, &cymru, &ipinfo]
            .into_iter()
            .find_map(|source| source.as_ref().ok());
        match winner {
            Some((asn, name)) => {
                report.asn = asn.clone();
                report.result.geoipdb.name =
                    self.override_name(asn).unwrap_or_else(|| name.clone());
            }
            None => report.result.geoipdb.err = GeoError::NoAnswer.to_string(),
        }

        report.result.asndb = self.asndb_answer(&report.asn);
        report
    }

    /// Admin lookup by ASN id: only the sources that can answer for a bare
    /// id are consulted.
    pub async fn lookup_all_by_asn(&self, asn: &str) -> AsnLookupReport {
        let mut report = AsnLookupReport {
            asn: asn.to_owned(),
            ..Default::default()
        };

        let unsupported = GeoError::AsnLookupUnsupported.to_string();
        report.result.maxmind.err = unsupported.clone();
        report.result.ipinfo.err = unsupported.clone();
        report.result.geoipdb.err = unsupported;

        report.result.cymru = SourceAnswer::from(cymru::description(&self.resolver, asn).await);
        report.result.asndb = self.asndb_answer(asn);
        report
    }

    fn asndb_answer(&self, asn: &str) -> SourceAnswer {
        let lookup = self.overrides().and_then(|store| {
            store
                .lookup(asn)?
                .ok_or(OverrideError::NotFound)
        });
        match lookup {
            Ok(name) => SourceAnswer {
                name,
                err: String::new(),
            },
            Err(e) => SourceAnswer {
                name: String::new(),
                err: e.to_string(),
            },
        }
    }
}

/// Answered by the asnlookup admin surface: one slot per source.
#[derive(Debug, Default, Serialize)]
pub struct AsnLookupReport {
    pub asn: String,
    pub ip: String,
    pub result: AsnLookupSources,
}

#[derive(Debug, Default, Serialize)]
pub struct AsnLookupSources {
    pub maxmind: SourceAnswer,
    pub ipinfo: SourceAnswer,
    pub cymru: SourceAnswer,
    pub asndb: SourceAnswer,
    pub geoipdb: SourceAnswer,
}

#[derive(Debug, Default, Serialize)]
pub struct SourceAnswer {
    pub name: String,
    pub err: String,
}

impl From<Result<String, GeoError>> for SourceAnswer {
    fn from(result: Result<String, GeoError>) -> Self {
        match result {
            Ok(name) => Self {
                name,
                err: String::new(),
            },
            Err(e) => Self {
                name: String::new(),
                err: e.to_string(),
            },
        }
    }
}

fn source_slot(result: &Result<(String, String), GeoError>) -> SourceAnswer {
    match result {
        Ok((_, name)) => SourceAnswer {
            name: name.clone(),
            err: String::new(),
        },
        Err(e) => SourceAnswer {
            name: String::new(),
            err: e.to_string(),
        },
    }
}
