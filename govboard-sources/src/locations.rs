//! Pool relay geolocation

use std::collections::HashSet;

use govboard_core::model::{PoolLocation, SpoRecord};
use tracing::{info, warn};

use crate::geo::GeoClient;
use crate::http::SourceError;
use crate::relay::{resolve_relay, DnsLookup, Relay};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateStats {
    pub pools: usize,
    pub relays: usize,
    pub unresolved: usize,
    pub located: usize,
}

/// Resolve and geolocate every relay of `pools`.
///
/// Each distinct address is looked up once per pool. Unresolvable relays and
/// addresses ip-api has no data for are skipped. Running out of rate-limit
/// retries stops the run and returns what was located so far.
pub async fn locate_pools(
    pools: &[SpoRecord],
    dns: &dyn DnsLookup,
    geo: &GeoClient,
) -> (Vec<PoolLocation>, LocateStats) {
    let mut locations = Vec::new();
    let mut stats = LocateStats {
        pools: pools.len(),
        ..Default::default()
    };

    'pools: for pool in pools {
        let relays = pool.relays.as_ref().map(Relay::list_from).unwrap_or_default();
        let mut seen = HashSet::new();

        for relay in relays {
            stats.relays += 1;
            let Some(ip) = resolve_relay(&relay, dns).await else {
                stats.unresolved += 1;
                continue;
            };
            if !seen.insert(ip) {
                continue;
            }

            match geo.lookup(ip).await {
                Ok(Some(info)) => {
                    stats.located += 1;
                    locations.push(PoolLocation {
                        pool_id_bech32: pool.pool_id_bech32.clone(),
                        ticker: pool.ticker.clone(),
                        relay: relay.label(),
                        ip: ip.to_string(),
                        country: info.country,
                        country_code: info.country_code,
                        region: info.region_name,
                        city: info.city,
                        lat: info.lat,
                        lon: info.lon,
                        isp: info.isp,
                    });
                }
                Ok(None) => {}
                Err(err @ SourceError::RateLimited { .. }) => {
                    warn!(error = %err, "giving up on geolocation");
                    break 'pools;
                }
                Err(err) => warn!(pool = %pool.pool_id_bech32, %ip, error = %err, "geolocation failed"),
            }
        }
    }

    info!(
        pools = stats.pools,
        relays = stats.relays,
        unresolved = stats.unresolved,
        located = stats.located,
        "relay geolocation complete"
    );
    (locations, stats)
}
