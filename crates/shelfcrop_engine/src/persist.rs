use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use shelfcrop_logging::pipeline_warn;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("unsupported crop format: {0}")]
    UnsupportedFormat(String),
    #[error("metadata serialization failed: {0}")]
    Metadata(String),
}

/// Create `dir` (and parents) if needed; an existing non-directory is an error.
pub fn prepare_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(unusable("not a directory".into())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|err| unusable(err.to_string()))
        }
        Err(err) => Err(unusable(err.to_string())),
    }
}

fn write_temp(dir: &Path, content: &[u8]) -> Result<NamedTempFile, PersistError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file_mut().sync_all()?;
    Ok(tmp)
}

/// Single-file writes into one directory: temp file in place, then rename over the target.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_bytes(filename, content.as_bytes())
    }

    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        write_temp(&self.dir, content)?
            .persist(&target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}

/// Files that must appear together or not at all, such as an image's crops and their sidecar.
///
/// Content is staged in temp files next to each target. Nothing is visible under a final
/// name until [`StagedFiles::commit`]; dropping an uncommitted set removes the temp files.
#[derive(Debug, Default)]
pub struct StagedFiles {
    staged: Vec<(NamedTempFile, PathBuf)>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Returns the path the file will have once committed.
    pub fn stage(
        &mut self,
        dir: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, PersistError> {
        let target = dir.join(filename);
        let tmp = write_temp(dir, content)?;
        self.staged.push((tmp, target.clone()));
        Ok(target)
    }

    /// Rename every staged file into place, in staging order. On failure the files already
    /// renamed are removed again and the remaining temp files are dropped.
    pub fn commit(self) -> Result<Vec<PathBuf>, PersistError> {
        let mut placed: Vec<PathBuf> = Vec::with_capacity(self.staged.len());
        for (tmp, target) in self.staged {
            if let Err(err) = tmp.persist(&target) {
                for path in &placed {
                    if let Err(remove_err) = fs::remove_file(path) {
                        pipeline_warn!("Could not roll back {:?}: {}", path, remove_err);
                    }
                }
                return Err(PersistError::Io(err.error));
            }
            placed.push(target);
        }
        Ok(placed)
    }
}
