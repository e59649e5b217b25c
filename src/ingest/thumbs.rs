//! Thumbnail generation into a size-partitioned cache tree.
//!
//! For each configured size the source image is resized once (aspect ratio
//! preserved, Lanczos3) and written as JPEG under
//! `<root>/<size>/<relative path with extension swapped to .jpg>`. The
//! canonical thumb path stored with the photo is the size-agnostic relative
//! part; consumers prepend the size directory they want.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::warn;

use crate::config::ThumbnailConfig;

pub struct ThumbnailGenerator {
    root: PathBuf,
    sizes: Vec<u32>,
    quality: u8,
}

impl ThumbnailGenerator {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            root: config.root.clone(),
            sizes: config.sizes.clone(),
            quality: config.quality,
        }
    }

    /// The relative thumbnail path for a photo at `rel_path` under the
    /// import root: same directory structure, extension swapped to `.jpg`.
    pub fn thumb_rel_path(rel_path: &Path) -> PathBuf {
        rel_path.with_extension("jpg")
    }

    /// Generate all size variants for one photo. Returns the canonical
    /// relative thumb path if at least one variant was written; a size that
    /// fails is logged and skipped without failing the others.
    pub fn generate(&self, source: &Path, rel_path: &Path) -> Result<Option<PathBuf>> {
        let img = image::open(source)
            .with_context(|| format!("decoding {} for thumbnails", source.display()))?;
        let rel_thumb = Self::thumb_rel_path(rel_path);

        let mut written = 0usize;
        for &size in &self.sizes {
            let target = self.root.join(size.to_string()).join(&rel_thumb);
            match self.write_variant(&img, size, &target) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(size, path = %target.display(), error = %e, "thumbnail variant failed");
                }
            }
        }

        Ok((written > 0).then_some(rel_thumb))
    }

    fn write_variant(&self, img: &image::DynamicImage, size: u32, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // resize() fits within size x size keeping aspect ratio
        let resized = img.resize(size, size, FilterType::Lanczos3);

        // JPEG has no alpha channel
        let rgb = resized.to_rgb8();
        let file = fs::File::create(target)?;
        let mut encoder = JpegEncoder::new_with_quality(std::io::BufWriter::new(file), self.quality);
        encoder.encode_image(&rgb)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(root: &Path, sizes: Vec<u32>) -> ThumbnailGenerator {
        ThumbnailGenerator::new(&ThumbnailConfig {
            root: root.to_path_buf(),
            sizes,
            quality: 80,
        })
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 60, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn variants_land_in_size_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.png");
        write_png(&source, 200, 100);

        let thumbs = dir.path().join("thumbs");
        let generator = generator(&thumbs, vec![64, 128]);
        let rel = Path::new("Europe/France/wide.png");

        let thumb_path = generator.generate(&source, rel).unwrap();
        assert_eq!(thumb_path.as_deref(), Some(Path::new("Europe/France/wide.jpg")));

        for size in ["64", "128"] {
            assert!(thumbs.join(size).join("Europe/France/wide.jpg").exists());
        }
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.png");
        write_png(&source, 200, 100);

        let thumbs = dir.path().join("thumbs");
        generator(&thumbs, vec![64])
            .generate(&source, Path::new("wide.png"))
            .unwrap();

        let (w, h) = image::ImageReader::open(thumbs.join("64/wide.jpg"))
            .unwrap()
            .into_dimensions()
            .unwrap();
        assert_eq!((w, h), (64, 32));
    }

    #[test]
    fn alpha_sources_are_flattened_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("rgba.png");
        write_png(&source, 32, 32);

        let thumbs = dir.path().join("thumbs");
        let thumb_path = generator(&thumbs, vec![16])
            .generate(&source, Path::new("rgba.png"))
            .unwrap();
        assert!(thumb_path.is_some());

        let format = image::ImageReader::open(thumbs.join("16/rgba.jpg"))
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(image::ImageFormat::Jpeg));
    }

    #[test]
    fn undecodable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"not a png").unwrap();

        let thumbs = dir.path().join("thumbs");
        let result = generator(&thumbs, vec![64]).generate(&source, Path::new("broken.png"));
        assert!(result.is_err());
    }

    #[test]
    fn no_sizes_configured_yields_no_thumb_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("img.png");
        write_png(&source, 32, 32);

        let thumbs = dir.path().join("thumbs");
        let thumb_path = generator(&thumbs, vec![])
            .generate(&source, Path::new("img.png"))
            .unwrap();
        assert_eq!(thumb_path, None);
    }
}
