//! Saving the bundled image to the public pictures directory.
//!
//! [`ImageExporter::export`] runs synchronously; [`ImageExporter::spawn`]
//! moves the same work onto a worker thread so the event loop only receives
//! the finished path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use tracing::{info, warn};

use crate::{ExportError, ExportSettings};

pub const PNG_MIME: &str = "image/png";

/// Upper bound on `_<n>` suffixes tried for one timestamp.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// The image shipped with the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    fn decode(&self) -> Result<image::DynamicImage, ExportError> {
        match self {
            ImageSource::File(path) => {
                let bytes = fs::read(path)?;
                image::load_from_memory(&bytes).map_err(ExportError::Decode)
            }
            ImageSource::Bytes(bytes) => image::load_from_memory(bytes).map_err(ExportError::Decode),
        }
    }
}

/// Registry that makes new files visible to gallery applications.
pub trait MediaIndex: Send + Sync {
    fn register(&self, path: &Path, mime: &str) -> Result<(), ExportError>;
}

/// Index that only logs the registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMediaIndex;

impl MediaIndex for TracingMediaIndex {
    fn register(&self, path: &Path, mime: &str) -> Result<(), ExportError> {
        info!(path = %path.display(), mime, "registered media file");
        Ok(())
    }
}

/// Index that appends `path<TAB>mime` lines to a journal file.
#[derive(Debug)]
pub struct JournalMediaIndex {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JournalMediaIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Every registered entry in order.
    pub fn entries(&self) -> Result<Vec<(PathBuf, String)>, ExportError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(raw
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(path, mime)| (PathBuf::from(path), mime.to_string()))
            .collect())
    }
}

impl MediaIndex for JournalMediaIndex {
    fn register(&self, path: &Path, mime: &str) -> Result<(), ExportError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(journal, "{}\t{mime}", path.display())?;
        Ok(())
    }
}

type Clock = dyn Fn() -> u128 + Send + Sync;

/// One-shot PNG export of the bundled image.
pub struct ImageExporter {
    pictures_dir: PathBuf,
    file_prefix: String,
    index: Box<dyn MediaIndex>,
    clock: Box<Clock>,
}

impl ImageExporter {
    pub fn new(settings: &ExportSettings, index: Box<dyn MediaIndex>) -> Self {
        Self {
            pictures_dir: settings.pictures_dir.clone(),
            file_prefix: settings.file_prefix.clone(),
            index,
            clock: Box::new(unix_millis),
        }
    }

    /// Replaces the wall clock used for file names.
    pub fn with_clock(mut self, clock: impl Fn() -> u128 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Decodes `source`, writes it as a PNG under a fresh timestamped name and
    /// registers the file with the media index.
    pub fn export(&self, source: &ImageSource) -> Result<PathBuf, ExportError> {
        let image = source.decode()?;
        let rgba = image.to_rgba8();

        fs::create_dir_all(&self.pictures_dir)?;
        let (path, file) = self.claim_file((self.clock)())?;

        if let Err(err) = write_png(file, &rgba) {
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), %cleanup, "removing partial export");
            }
            return Err(err);
        }

        if let Err(err) = self.index.register(&path, PNG_MIME) {
            warn!(path = %path.display(), %err, "media index registration failed");
        }
        info!(path = %path.display(), "image exported");
        Ok(path)
    }

    /// Runs [`export`](Self::export) on a worker thread.
    pub fn spawn(self: &Arc<Self>, source: ImageSource) -> ExportTask {
        let exporter = Arc::clone(self);
        let handle = thread::spawn(move || exporter.export(&source));
        ExportTask { handle }
    }

    /// Creates `<prefix>_<millis>.png`, falling back to `<prefix>_<millis>_<n>.png`
    /// when another export already took the name.
    fn claim_file(&self, millis: u128) -> Result<(PathBuf, File), ExportError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.pictures_dir.join(file_name(&self.file_prefix, millis, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(ExportError::NameExhausted(
            self.pictures_dir.join(file_name(&self.file_prefix, millis, 0)),
        ))
    }
}

impl std::fmt::Debug for ImageExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageExporter")
            .field("pictures_dir", &self.pictures_dir)
            .field("file_prefix", &self.file_prefix)
            .finish()
    }
}

/// Export running on a worker thread.
#[derive(Debug)]
pub struct ExportTask {
    handle: JoinHandle<Result<PathBuf, ExportError>>,
}

impl ExportTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the worker is done.
    pub fn wait(self) -> Result<PathBuf, ExportError> {
        self.handle.join().map_err(|_| ExportError::Worker)?
    }
}

pub fn file_name(prefix: &str, millis: u128, attempt: u32) -> String {
    if attempt == 0 {
        format!("{prefix}_{millis}.png")
    } else {
        format!("{prefix}_{millis}_{attempt}.png")
    }
}

fn write_png(file: File, image: &image::RgbaImage) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(file);
    PngEncoder::new_with_quality(&mut writer, CompressionType::Best, FilterType::Adaptive)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(ExportError::Encode)?;
    writer.flush()?;
    Ok(())
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageOutputFormat, Rgba, RgbaImage};

    use super::*;

    fn sample_png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(3, 2, Rgba([200, 120, 40, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn exporter(dir: &Path) -> ImageExporter {
        let settings = ExportSettings {
            pictures_dir: dir.join("Pictures"),
            ..ExportSettings::default()
        };
        ImageExporter::new(&settings, Box::new(TracingMediaIndex))
    }

    #[test]
    fn writes_timestamped_png() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path()).with_clock(|| 1_700_000_000_123);

        let path = exporter.export(&ImageSource::Bytes(sample_png())).unwrap();

        assert_eq!(path, dir.path().join("Pictures").join("gato_1700000000123.png"));
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (3, 2));
        assert_eq!(written.to_rgba8().get_pixel(0, 0), &Rgba([200, 120, 40, 255]));
    }

    #[test]
    fn same_millisecond_exports_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path()).with_clock(|| 42);
        let source = ImageSource::Bytes(sample_png());

        let first = exporter.export(&source).unwrap();
        let second = exporter.export(&source).unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("gato_42.png"));
        assert!(second.ends_with("gato_42_1.png"));
    }

    #[test]
    fn undecodable_source_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path());

        let err = exporter
            .export(&ImageSource::Bytes(b"not an image".to_vec()))
            .unwrap_err();

        assert!(matches!(err, ExportError::Decode(_)));
        assert!(!dir.path().join("Pictures").exists());
    }

    #[test]
    fn missing_source_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path());

        let err = exporter
            .export(&ImageSource::File(dir.path().join("gato.png")))
            .unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn journal_index_records_exports() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ExportSettings {
            pictures_dir: dir.path().to_path_buf(),
            ..ExportSettings::default()
        };
        let journal = Arc::new(JournalMediaIndex::new(dir.path().join("index.tsv")));
        let exporter = ImageExporter::new(&settings, Box::new(SharedIndex(journal.clone())));

        let path = exporter.export(&ImageSource::Bytes(sample_png())).unwrap();

        assert_eq!(journal.entries().unwrap(), vec![(path, PNG_MIME.to_string())]);
    }

    #[test]
    fn background_export_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(exporter(dir.path()).with_clock(|| 7));

        let task = exporter.spawn(ImageSource::Bytes(sample_png()));
        let path = task.wait().unwrap();

        assert!(path.ends_with("gato_7.png"));
        assert!(path.exists());
    }

    #[test]
    fn name_suffix_only_after_collision() {
        assert_eq!(file_name("gato", 5, 0), "gato_5.png");
        assert_eq!(file_name("gato", 5, 3), "gato_5_3.png");
    }

    struct SharedIndex(Arc<JournalMediaIndex>);

    impl MediaIndex for SharedIndex {
        fn register(&self, path: &Path, mime: &str) -> Result<(), ExportError> {
            self.0.register(path, mime)
        }
    }
}
