use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::errors::{MagicMaskError, Result};

/// Extensions picked up when the input is a folder.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Suffix appended to every output file stem.
pub const OUTPUT_SUFFIX: &str = "_masked";

/// What the user asked for when pressing start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub config: ProcessingConfig,
}

impl BatchRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            config,
        }
    }

    /// Rejects requests with a missing input or output path.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(MagicMaskError::configuration(
                "please select input and output paths",
            ));
        }
        Ok(())
    }

    /// Resolves the input into the ordered list of files to process.
    pub fn resolve(self) -> Result<BatchJob> {
        let files = collect_input_files(&self.input)?;
        Ok(BatchJob {
            files,
            output_dir: self.output_dir,
            config: self.config,
        })
    }
}

/// A resolved batch: consumed entirely by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub config: ProcessingConfig,
}

impl BatchJob {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| MagicMaskError::FileSystem {
            path: self.output_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })
    }
}

pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// A file yields itself; a folder yields its supported images, sorted by path.
///
/// Subfolders are not searched.
pub fn collect_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(MagicMaskError::FileSystem {
            path: input.to_path_buf(),
            operation: "read input".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "input path does not exist",
            ),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| MagicMaskError::FileSystem {
            path: input.to_path_buf(),
            operation: "list input directory".to_string(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_supported_image_format(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(MagicMaskError::NoInput {
            path: input.to_path_buf(),
        });
    }
    for stem in colliding_output_stems(&files) {
        warn!(
            stem = %stem.to_string_lossy(),
            "Several inputs share this name; only the last one's output is kept"
        );
    }
    debug!(count = files.len(), input = %input.display(), "Collected input images");
    Ok(files)
}

/// `<output_dir>/<stem>_masked.png`, keeping the stem's exact bytes.
pub fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        MagicMaskError::configuration(format!("input has no file name: {}", input.display()))
    })?;
    let mut name = stem.to_os_string();
    name.push(format!("{OUTPUT_SUFFIX}.png"));
    Ok(output_dir.join(name))
}

/// Stems shared by more than one input; their outputs overwrite each other.
pub fn colliding_output_stems(files: &[PathBuf]) -> Vec<OsString> {
    let mut seen = HashSet::new();
    let mut colliding = Vec::new();
    for stem in files.iter().filter_map(|file| file.file_stem()) {
        if !seen.insert(stem) && !colliding.iter().any(|c: &OsString| c == stem) {
            colliding.push(stem.to_os_string());
        }
    }
    colliding
}
