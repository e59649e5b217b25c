//! Location resolution: map a geo-hierarchy tuple to a stable id.

use anyhow::Result;

use super::Database;
use crate::ingest::geo::GeoInfo;

impl Database {
    /// Look up a location by its exact 4-tuple. Unset levels match the
    /// empty string.
    pub fn find_location(&self, geo: &GeoInfo) -> Result<Option<i64>> {
        let result = self.conn().query_row(
            "SELECT id FROM locations WHERE continent = ? AND country = ? AND province = ? AND city = ?",
            rusqlite::params![
                geo.continent.as_deref().unwrap_or(""),
                geo.country.as_deref().unwrap_or(""),
                geo.province.as_deref().unwrap_or(""),
                geo.city.as_deref().unwrap_or(""),
            ],
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the id for a tuple, creating the row on first encounter.
    ///
    /// One atomic statement: the no-op `DO UPDATE` on conflict lets
    /// `RETURNING` yield the existing id, so two workers racing on the
    /// same tuple both get the winner's row.
    pub fn resolve_location(&self, geo: &GeoInfo) -> Result<i64> {
        let id = self.conn().query_row(
            r#"
            INSERT INTO locations (continent, country, province, city)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (continent, country, province, city)
            DO UPDATE SET continent = excluded.continent
            RETURNING id
            "#,
            rusqlite::params![
                geo.continent.as_deref().unwrap_or(""),
                geo.country.as_deref().unwrap_or(""),
                geo.province.as_deref().unwrap_or(""),
                geo.city.as_deref().unwrap_or(""),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn location_count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count)
    }
}
