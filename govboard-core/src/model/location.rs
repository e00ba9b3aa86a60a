use serde::{Deserialize, Serialize};

/// Geolocated relay of a stake pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolLocation {
    pub pool_id_bech32: String,
    pub ticker: Option<String>,
    pub relay: String,
    pub ip: String,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub isp: Option<String>,
}
