pub mod dates;
pub mod geo;
pub mod gps;
pub mod iptc;
pub mod metadata;
pub mod thumbs;
pub mod xmp;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db::{Database, MetadataNamespace, NewPhoto};

pub use geo::GeoInfo;
pub use metadata::PhotoMetadata;
pub use thumbs::ThumbnailGenerator;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Stat,
    Thumbnail,
    Location,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Stat => "stat",
            Stage::Thumbnail => "thumbnail",
            Stage::Location => "location",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// One photo that could not be imported. The rest of the run continues.
#[derive(Debug, thiserror::Error)]
#[error("{file}: {stage}: {message}")]
pub struct IngestFailure {
    pub file: String,
    pub stage: Stage,
    pub message: String,
}

impl IngestFailure {
    fn new(path: &Path, stage: Stage, err: impl fmt::Display) -> Self {
        Self {
            file: path.display().to_string(),
            stage,
            message: err.to_string(),
        }
    }
}

/// Recursively find importable images under `root`, filtered by extension
/// (case-insensitive), sorted by path for deterministic runs.
pub fn discover_images(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if extensions.iter().any(|e| e.to_lowercase() == ext_lower) {
                images.push(path.to_path_buf());
            }
        }
    }

    images.sort();
    Ok(images)
}

/// Runs the full pipeline for a single photo.
pub struct PhotoIngestor<'a> {
    db: &'a Database,
    thumbs: ThumbnailGenerator,
    root: PathBuf,
    public_by_default: bool,
}

impl<'a> PhotoIngestor<'a> {
    pub fn new(db: &'a Database, config: &Config, root: &Path) -> Self {
        Self {
            db,
            thumbs: ThumbnailGenerator::new(&config.thumbnails),
            root: root.to_path_buf(),
            public_by_default: config.import.public_by_default,
        }
    }

    /// Import one photo: directory geo, metadata, timestamp, thumbnails,
    /// location row, photo row, raw metadata entries and tags. Returns the
    /// photo id.
    pub fn process(&self, path: &Path) -> std::result::Result<i64, IngestFailure> {
        let rel_path = path
            .strip_prefix(&self.root)
            .map_err(|e| IngestFailure::new(path, Stage::Stat, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| IngestFailure::new(path, Stage::Stat, e))?;

        let geo = GeoInfo::parse(&self.root, path);
        let location_id = self
            .db
            .resolve_location(&geo)
            .map_err(|e| IngestFailure::new(path, Stage::Location, e))?;

        let metadata = metadata::extract(path);
        let taken_at = dates::resolve_taken_at(&metadata.exif, &file_name, mtime);

        let thumb_path = self
            .thumbs
            .generate(path, rel_path)
            .map_err(|e| IngestFailure::new(path, Stage::Thumbnail, e))?
            .map(|p| p.to_string_lossy().into_owned());

        let photo = NewPhoto {
            location_id: Some(location_id),
            file_name,
            file_path: path.to_string_lossy().into_owned(),
            thumb_path,
            width: metadata.width,
            height: metadata.height,
            taken_at: Some(taken_at),
            camera_make: metadata.camera_make.clone(),
            camera_model: metadata.camera_model.clone(),
            lens: metadata.lens.clone(),
            iso: metadata.iso,
            aperture: metadata.aperture,
            shutter: metadata.shutter.clone(),
            focal_length: metadata.focal_length,
            gps_lat: metadata.gps_lat,
            gps_lon: metadata.gps_lon,
            gps_alt: metadata.gps_alt,
            is_public: self.public_by_default,
        };

        let photo_id = self
            .db
            .upsert_photo(&photo)
            .map_err(|e| IngestFailure::new(path, Stage::Persist, e))?;

        self.persist_details(photo_id, &metadata);

        Ok(photo_id)
    }

    /// The metadata and tag sub-writes are independent of each other; one
    /// failing entry is logged and does not block the rest.
    fn persist_details(&self, photo_id: i64, metadata: &PhotoMetadata) {
        let namespaces = [
            (MetadataNamespace::Exif, &metadata.exif),
            (MetadataNamespace::Iptc, &metadata.iptc.entries),
            (MetadataNamespace::Xmp, &metadata.xmp.entries),
        ];
        for (namespace, entries) in namespaces {
            for (key, value) in entries {
                if let Err(e) = self.db.upsert_metadata_entry(photo_id, namespace, key, value) {
                    warn!(photo_id, key, error = %e, "metadata entry write failed");
                }
            }
        }
        for tag in metadata.tags() {
            if let Err(e) = self.db.add_tag_if_absent(photo_id, &tag) {
                warn!(photo_id, tag, error = %e, "tag write failed");
            }
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<IngestFailure>,
}

/// Walks an import root and runs the pipeline across a worker pool.
pub struct ImportRunner {
    config: Config,
    cancel: Arc<AtomicBool>,
}

impl ImportRunner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; setting it stops dispatching new photos. Photos already
    /// in flight finish normally.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, db: &Database, root: &Path) -> Result<ImportReport> {
        anyhow::ensure!(
            root.is_dir(),
            "import root {} is not a readable directory",
            root.display()
        );
        let images = discover_images(root, &self.config.scanner.image_extensions)?;
        info!(root = %root.display(), count = images.len(), "starting import");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.scanner.concurrency)
            .build()
            .context("building worker pool")?;

        let ingestor = PhotoIngestor::new(db, &self.config, root);
        let cancel = &self.cancel;

        let outcomes: Vec<Option<std::result::Result<i64, IngestFailure>>> = pool.install(|| {
            images
                .par_iter()
                .map(|path| {
                    if cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    Some(ingestor.process(path))
                })
                .collect()
        });

        let mut report = ImportReport {
            discovered: images.len(),
            ..ImportReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Some(Ok(_)) => report.succeeded += 1,
                Some(Err(failure)) => {
                    warn!(%failure, "photo import failed");
                    report.failed += 1;
                    report.failures.push(failure);
                }
                None => report.skipped += 1,
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config(thumb_root: &Path) -> Config {
        let mut config = Config::default();
        config.thumbnails.root = thumb_root.to_path_buf();
        config.thumbnails.sizes = vec![32];
        config
    }

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 90]));
        img.save(path).unwrap();
    }

    #[test]
    fn full_run_imports_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        let tagged = root.join("Europe/France/Provence/Marseille/2023-06/IMG_20230615_143022.png");
        let plain = root.join("loose.png");
        write_png(&tagged, 64, 48);
        write_png(&plain, 48, 64);
        fs::write(root.join("notes.txt"), "not an image").unwrap();

        let db = test_db();
        let runner = ImportRunner::new(test_config(&dir.path().join("thumbs")));

        let report = runner.run(&db, &root).unwrap();
        assert_eq!(report.discovered, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(db.photo_count().unwrap(), 2);

        // Second run lands on the same rows.
        let report = runner.run(&db, &root).unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(db.photo_count().unwrap(), 2);
        assert_eq!(db.location_count().unwrap(), 2);

        let row = db
            .photo_by_path(&tagged.to_string_lossy())
            .unwrap()
            .unwrap();
        assert_eq!(row.width, Some(64));
        assert_eq!(
            row.thumb_path.as_deref(),
            Some("Europe/France/Provence/Marseille/2023-06/IMG_20230615_143022.jpg")
        );
        assert_eq!(row.taken_at.as_deref(), Some("2023-06-15 14:30:22"));
        assert!(row.location_id.is_some());
        assert!(dir
            .path()
            .join("thumbs/32/Europe/France/Provence/Marseille/2023-06/IMG_20230615_143022.jpg")
            .exists());
    }

    #[test]
    fn corrupt_file_fails_without_stopping_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        write_png(&root.join("good.png"), 32, 32);
        fs::write(root.join("bad.png"), b"not a png at all").unwrap();

        let db = test_db();
        let runner = ImportRunner::new(test_config(&dir.path().join("thumbs")));

        let report = runner.run(&db, &root).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].stage, Stage::Thumbnail);
        assert_eq!(db.photo_count().unwrap(), 1);
    }

    #[test]
    fn cancelled_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        write_png(&root.join("a.png"), 16, 16);
        write_png(&root.join("b.png"), 16, 16);

        let db = test_db();
        let runner = ImportRunner::new(test_config(&dir.path().join("thumbs")));
        runner.cancel_flag().store(true, Ordering::Relaxed);

        let report = runner.run(&db, &root).unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.succeeded, 0);
        assert_eq!(db.photo_count().unwrap(), 0);
    }

    #[test]
    fn date_directory_does_not_set_taken_at() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        let path = root.join("2023-06/plain.png");
        write_png(&path, 16, 16);

        let db = test_db();
        ImportRunner::new(test_config(&dir.path().join("thumbs")))
            .run(&db, &root)
            .unwrap();

        // No embedded or filename date: mtime is the terminal fallback,
        // the directory date hint only strips the geography segment.
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        let expected = chrono::DateTime::<chrono::Utc>::from(mtime)
            .naive_utc()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let row = db
            .photo_by_path(&path.to_string_lossy())
            .unwrap()
            .unwrap();
        assert_eq!(row.taken_at.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn missing_root_is_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db();
        let runner = ImportRunner::new(test_config(&dir.path().join("thumbs")));
        assert!(runner.run(&db, &dir.path().join("nope")).is_err());
    }

    #[test]
    fn loose_photo_gets_the_unknown_location() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        write_png(&root.join("loose.png"), 16, 16);

        let db = test_db();
        ImportRunner::new(test_config(&dir.path().join("thumbs")))
            .run(&db, &root)
            .unwrap();

        let row = db
            .photo_by_path(&root.join("loose.png").to_string_lossy())
            .unwrap()
            .unwrap();
        let unknown = db.find_location(&GeoInfo::default()).unwrap();
        assert_eq!(row.location_id, unknown);
    }
}
