use crate::error::{Error, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Default output file name.
pub(crate) const DEFAULT_OUTPUT_FILE: &str = "documentation.md";

/// Markdown accumulated over one run.
///
/// Append-only; sections are separated by a blank line.
#[derive(Debug, Clone, Default)]
pub struct DocumentationBuffer {
    content: String,
    sections: usize,
}

impl DocumentationBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one generated section.
    pub fn append(&mut self, section: &str) {
        if self.sections > 0 {
            self.content.push_str("\n\n");
        }
        self.content.push_str(section);
        self.sections += 1;
    }

    /// Number of sections appended so far.
    #[must_use]
    pub const fn sections(&self) -> usize {
        self.sections
    }

    /// Accumulated Markdown.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Writes the buffer to `path`, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        write_file_atomic(path, &self.content)?;

        info!(
            "Wrote {} section(s) ({} bytes) to {}",
            self.sections,
            self.content.len(),
            path.display()
        );
        Ok(())
    }
}

/// Writes a file atomically.
///
/// # Process
///
/// 1. Writes content to a temporary sibling file
/// 2. Syncs the temporary file to disk
/// 3. Renames it over the target path
///
/// The temporary file is removed if any step fails.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_path_for(path);

    let result = replace_with_temp(path, &temp_path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result?;

    debug!("Replaced {}", path.display());
    Ok(())
}

fn replace_with_temp(path: &Path, temp_path: &Path, content: &str) -> Result<()> {
    let mut temp_file = fs::File::create(temp_path).map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| Error::io(temp_path, e))?;

    drop(temp_file);

    fs::rename(temp_path, path).map_err(|e| Error::io(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::fs;

    #[test]
    fn test_sections_separated_by_blank_line() {
        let mut buffer = DocumentationBuffer::new();
        buffer.append("**File: a.py**");
        buffer.append("**File: b.py**");

        assert_eq!(buffer.as_str(), "**File: a.py**\n\n**File: b.py**");
        assert_eq!(buffer.sections(), 2);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = DocumentationBuffer::new();
        assert_eq!(buffer.as_str(), "");
        assert_eq!(buffer.sections(), 0);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("documentation.md");
        output.write_str("stale content from an earlier run").unwrap();

        let mut buffer = DocumentationBuffer::new();
        buffer.append("fresh");
        buffer.write_to(output.path()).unwrap();

        output.assert("fresh");

        // no temporary file left behind
        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["documentation.md".to_string()]);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("docs/generated/documentation.md");

        DocumentationBuffer::new().write_to(output.path()).unwrap();

        output.assert("");
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path_for(Path::new("out/documentation.md")),
            PathBuf::from("out/documentation.md.tmp")
        );
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        // a non-empty directory cannot be replaced by a file
        let output = temp.child("documentation.md");
        output.create_dir_all().unwrap();
        output.child("keep.txt").write_str("x").unwrap();

        let mut buffer = DocumentationBuffer::new();
        buffer.append("section");
        let err = buffer.write_to(output.path()).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(!temp.child("documentation.md.tmp").path().exists());
    }
}
