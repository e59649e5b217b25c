//! Photo persistence: idempotent upserts keyed by file path, plus the
//! per-namespace metadata tables and tags.

use anyhow::Result;
use chrono::NaiveDateTime;

use super::Database;

/// Metadata namespace a raw key/value entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataNamespace {
    Exif,
    Iptc,
    Xmp,
}

impl MetadataNamespace {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataNamespace::Exif => "exif",
            MetadataNamespace::Iptc => "iptc",
            MetadataNamespace::Xmp => "xmp",
        }
    }
}

/// Everything the ingestor writes for one photo row.
#[derive(Debug, Clone, Default)]
pub struct NewPhoto {
    pub location_id: Option<i64>,
    pub file_name: String,
    pub file_path: String,
    pub thumb_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub taken_at: Option<NaiveDateTime>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens: Option<String>,
    pub iso: Option<i64>,
    pub aperture: Option<f64>,
    pub shutter: Option<String>,
    pub focal_length: Option<f64>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub gps_alt: Option<f64>,
    pub is_public: bool,
}

/// A photo row as read back from the database.
#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub id: i64,
    pub location_id: Option<i64>,
    pub file_name: String,
    pub file_path: String,
    pub thumb_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub taken_at: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub is_public: bool,
}

impl Database {
    /// Insert or update the photo row keyed by `file_path`, returning its id.
    ///
    /// Re-importing the same path refreshes thumb_path, GPS fields and
    /// is_public; the id and created_at of the first import are kept.
    pub fn upsert_photo(&self, photo: &NewPhoto) -> Result<i64> {
        let taken_at = photo
            .taken_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        let id = self.conn().query_row(
            r#"
            INSERT INTO photos (
                location_id, file_name, file_path, thumb_path,
                width, height, taken_at,
                camera_make, camera_model, lens,
                iso, aperture, shutter, focal_length,
                gps_lat, gps_lon, gps_alt,
                is_public
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (file_path) DO UPDATE SET
                thumb_path = excluded.thumb_path,
                gps_lat = excluded.gps_lat,
                gps_lon = excluded.gps_lon,
                gps_alt = excluded.gps_alt,
                is_public = excluded.is_public
            RETURNING id
            "#,
            rusqlite::params![
                photo.location_id,
                photo.file_name,
                photo.file_path,
                photo.thumb_path,
                photo.width,
                photo.height,
                taken_at,
                photo.camera_make,
                photo.camera_model,
                photo.lens,
                photo.iso,
                photo.aperture,
                photo.shutter,
                photo.focal_length,
                photo.gps_lat,
                photo.gps_lon,
                photo.gps_alt,
                photo.is_public,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Write one raw metadata entry; an existing key in the same namespace
    /// gets its value overwritten.
    pub fn upsert_metadata_entry(
        &self,
        photo_id: i64,
        namespace: MetadataNamespace,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.conn().execute(
            r#"
            INSERT INTO photo_metadata (photo_id, namespace, key, value)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (photo_id, namespace, key) DO UPDATE SET value = excluded.value
            "#,
            rusqlite::params![photo_id, namespace.as_str(), key, value],
        )?;
        Ok(())
    }

    /// Attach a tag; re-adding an existing tag is a no-op.
    pub fn add_tag_if_absent(&self, photo_id: i64, tag: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO photo_tags (photo_id, tag) VALUES (?, ?) ON CONFLICT DO NOTHING",
            rusqlite::params![photo_id, tag],
        )?;
        Ok(())
    }

    pub fn photo_by_path(&self, file_path: &str) -> Result<Option<PhotoRow>> {
        let result = self.conn().query_row(
            r#"
            SELECT id, location_id, file_name, file_path, thumb_path,
                   width, height, taken_at, camera_make, camera_model, is_public
            FROM photos
            WHERE file_path = ?
            "#,
            [file_path],
            |row| {
                Ok(PhotoRow {
                    id: row.get(0)?,
                    location_id: row.get(1)?,
                    file_name: row.get(2)?,
                    file_path: row.get(3)?,
                    thumb_path: row.get(4)?,
                    width: row.get(5)?,
                    height: row.get(6)?,
                    taken_at: row.get(7)?,
                    camera_make: row.get(8)?,
                    camera_model: row.get(9)?,
                    is_public: row.get(10)?,
                })
            },
        );
        match result {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn photo_count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn tags_for_photo(&self, photo_id: i64) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT tag FROM photo_tags WHERE photo_id = ? ORDER BY tag")?;
        let tags = stmt
            .query_map([photo_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    pub fn metadata_value(
        &self,
        photo_id: i64,
        namespace: MetadataNamespace,
        key: &str,
    ) -> Result<Option<String>> {
        let result = self.conn().query_row(
            "SELECT value FROM photo_metadata WHERE photo_id = ? AND namespace = ? AND key = ?",
            rusqlite::params![photo_id, namespace.as_str(), key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn sample_photo(path: &str) -> NewPhoto {
        NewPhoto {
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            file_path: path.to_string(),
            thumb_path: Some("Europe/France/img.jpg".to_string()),
            width: Some(4000),
            height: Some(3000),
            ..NewPhoto::default()
        }
    }

    #[test]
    fn upsert_photo_keeps_id_on_reimport() {
        let db = test_db();
        let first = db.upsert_photo(&sample_photo("/photos/a.jpg")).unwrap();

        let mut updated = sample_photo("/photos/a.jpg");
        updated.thumb_path = Some("Europe/France/a.jpg".to_string());
        updated.gps_lat = Some(48.8566);
        let second = db.upsert_photo(&updated).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.photo_count().unwrap(), 1);

        let row = db.photo_by_path("/photos/a.jpg").unwrap().unwrap();
        assert_eq!(row.thumb_path.as_deref(), Some("Europe/France/a.jpg"));
    }

    #[test]
    fn distinct_paths_create_distinct_rows() {
        let db = test_db();
        let a = db.upsert_photo(&sample_photo("/photos/a.jpg")).unwrap();
        let b = db.upsert_photo(&sample_photo("/photos/b.jpg")).unwrap();
        assert_ne!(a, b);
        assert_eq!(db.photo_count().unwrap(), 2);
    }

    #[test]
    fn readding_a_tag_is_a_noop() {
        let db = test_db();
        let id = db.upsert_photo(&sample_photo("/photos/a.jpg")).unwrap();
        db.add_tag_if_absent(id, "sunset").unwrap();
        db.add_tag_if_absent(id, "sunset").unwrap();
        db.add_tag_if_absent(id, "beach").unwrap();
        assert_eq!(db.tags_for_photo(id).unwrap(), vec!["beach", "sunset"]);
    }

    #[test]
    fn metadata_reimport_overwrites_value() {
        let db = test_db();
        let id = db.upsert_photo(&sample_photo("/photos/a.jpg")).unwrap();
        db.upsert_metadata_entry(id, MetadataNamespace::Exif, "Make", "Canon")
            .unwrap();
        db.upsert_metadata_entry(id, MetadataNamespace::Exif, "Make", "Nikon")
            .unwrap();
        assert_eq!(
            db.metadata_value(id, MetadataNamespace::Exif, "Make")
                .unwrap()
                .as_deref(),
            Some("Nikon")
        );
    }

    #[test]
    fn metadata_namespaces_are_independent() {
        let db = test_db();
        let id = db.upsert_photo(&sample_photo("/photos/a.jpg")).unwrap();
        db.upsert_metadata_entry(id, MetadataNamespace::Exif, "Keywords", "from-exif")
            .unwrap();
        db.upsert_metadata_entry(id, MetadataNamespace::Iptc, "Keywords", "from-iptc")
            .unwrap();
        assert_eq!(
            db.metadata_value(id, MetadataNamespace::Iptc, "Keywords")
                .unwrap()
                .as_deref(),
            Some("from-iptc")
        );
        assert_eq!(
            db.metadata_value(id, MetadataNamespace::Exif, "Keywords")
                .unwrap()
                .as_deref(),
            Some("from-exif")
        );
    }

    #[test]
    fn taken_at_is_stored_as_text() {
        let db = test_db();
        let mut photo = sample_photo("/photos/a.jpg");
        photo.taken_at = chrono::NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(14, 30, 22);
        db.upsert_photo(&photo).unwrap();
        let row = db.photo_by_path("/photos/a.jpg").unwrap().unwrap();
        assert_eq!(row.taken_at.as_deref(), Some("2023-06-15 14:30:22"));
    }
}
