use anyhow::{Result, Context};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::ArtifactKind;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Destination path of a derived artifact
    // @params: source file, destination directory, artifact kind
    pub fn derived_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        source_file: P1,
        dest_dir: P2,
        kind: ArtifactKind,
    ) -> PathBuf {
        // Get the file stem (filename without extension)
        let stem = source_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(kind.suffix());

        dest_dir.as_ref().join(output_filename)
    }

    /// Read a file as raw bytes
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Replace (or create) a file so readers never observe a partial write.
    ///
    /// Content goes to a temporary file in the target directory first, which
    /// is then renamed over the destination.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> std::io::Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".bisub-")
            .tempfile_in(parent)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Append `key=value` lines to a file, creating it if needed
    pub fn append_key_values<P: AsRef<Path>>(path: P, pairs: &[(&str, String)]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open output file: {:?}", path.as_ref()))?;

        for (key, value) in pairs {
            writeln!(file, "{}={}", key, value)
                .with_context(|| format!("Failed to write to output file: {:?}", path.as_ref()))?;
        }

        Ok(())
    }
}

/// Render a relative path with forward slashes, as git and callers expect
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
