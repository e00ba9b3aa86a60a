use govboard_core::model::PoolLocation;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::error::DbResult;

const INSERT_CHUNK: usize = 1000;

#[derive(Debug, FromRow)]
struct LocationRow {
    pool_id_bech32: String,
    ticker: Option<String>,
    relay: String,
    ip: String,
    country: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    isp: Option<String>,
}

impl From<LocationRow> for PoolLocation {
    fn from(row: LocationRow) -> Self {
        PoolLocation {
            pool_id_bech32: row.pool_id_bech32,
            ticker: row.ticker,
            relay: row.relay,
            ip: row.ip,
            country: row.country,
            country_code: row.country_code,
            region: row.region,
            city: row.city,
            lat: row.lat,
            lon: row.lon,
            isp: row.isp,
        }
    }
}

pub struct LocationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LocationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert by `(pool_id_bech32, ip)`. Returns rows written.
    pub async fn upsert(&self, locations: &[PoolLocation]) -> DbResult<u64> {
        let mut written = 0;
        for chunk in locations.chunks(INSERT_CHUNK) {
            written += upsert_builder(chunk).build().execute(self.pool).await?.rows_affected();
        }
        Ok(written)
    }

    pub async fn list(&self) -> DbResult<Vec<PoolLocation>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT pool_id_bech32, ticker, relay, ip, country, country_code, region, city, lat, lon, isp
            FROM spo_locations
            ORDER BY pool_id_bech32, ip
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(PoolLocation::from).collect())
    }
}

fn upsert_builder(locations: &[PoolLocation]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO spo_locations \
         (pool_id_bech32, ip, ticker, relay, country, country_code, region, city, lat, lon, isp) ",
    );
    builder.push_values(locations, |mut row, l| {
        row.push_bind(&l.pool_id_bech32)
            .push_bind(&l.ip)
            .push_bind(&l.ticker)
            .push_bind(&l.relay)
            .push_bind(&l.country)
            .push_bind(&l.country_code)
            .push_bind(&l.region)
            .push_bind(&l.city)
            .push_bind(l.lat)
            .push_bind(l.lon)
            .push_bind(&l.isp);
    });
    builder.push(
        " ON CONFLICT (pool_id_bech32, ip) DO UPDATE SET ticker = EXCLUDED.ticker, relay = EXCLUDED.relay, \
         country = EXCLUDED.country, country_code = EXCLUDED.country_code, region = EXCLUDED.region, \
         city = EXCLUDED.city, lat = EXCLUDED.lat, lon = EXCLUDED.lon, isp = EXCLUDED.isp, updated_at = now()",
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keys_on_pool_and_ip() {
        let loc = PoolLocation {
            pool_id_bech32: "pool1abc".into(),
            ticker: Some("ABC".into()),
            relay: "relay.abc.io:3001".into(),
            ip: "203.0.113.7".into(),
            country: None,
            country_code: None,
            region: None,
            city: None,
            lat: None,
            lon: None,
            isp: None,
        };
        let locations = [loc];
        let builder = upsert_builder(&locations);
        let sql = builder.sql();
        assert!(sql.contains("$11)"));
        assert!(sql.contains("ON CONFLICT (pool_id_bech32, ip) DO UPDATE"));
    }
}
