pub const SCHEMA: &str = r#"
-- Locations: geographic hierarchy derived from directory structure.
-- The 4-tuple is the identity; unset levels are stored as empty strings
-- so the uniqueness constraint can match them.
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    continent TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    province TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (continent, country, province, city)
);

-- Photos: one row per source file, keyed by file_path.
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER REFERENCES locations(id),
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL UNIQUE,
    thumb_path TEXT,
    width INTEGER,
    height INTEGER,
    taken_at TEXT,

    -- Camera info
    camera_make TEXT,
    camera_model TEXT,
    lens TEXT,

    -- Exposure settings
    iso INTEGER,
    aperture REAL,
    shutter TEXT,
    focal_length REAL,

    -- GPS
    gps_lat REAL,
    gps_lon REAL,
    gps_alt REAL,

    is_public INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_photos_location ON photos(location_id);
CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at);

-- Tags: flat keywords per photo, unique per pair.
CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (photo_id, tag)
);

-- Raw embedded metadata, one row per key per namespace (exif/iptc/xmp).
CREATE TABLE IF NOT EXISTS photo_metadata (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (photo_id, namespace, key)
);

CREATE INDEX IF NOT EXISTS idx_photo_metadata_namespace ON photo_metadata(photo_id, namespace);
"#;
