//! Output destinations for generated code

use crate::error::GenerateResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Where generated text goes
pub trait OutputSink {
    /// Write the complete generated module
    fn write(&mut self, text: &str) -> GenerateResult<()>;
}

/// Writes the module to a file, creating parent directories
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// A sink writing to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, text: &str) -> GenerateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, text)?;
        tracing::info!("wrote {} bytes to {}", text.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the module in memory
#[derive(Debug, Clone, Default)]
pub struct StringSink {
    text: Option<String>,
}

impl StringSink {
    /// An empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// The written text, if anything was written
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Take the written text
    pub fn into_text(self) -> Option<String> {
        self.text
    }
}

impl OutputSink for StringSink {
    fn write(&mut self, text: &str) -> GenerateResult<()> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("gen_calc.py");
        let mut sink = FileSink::new(&path);
        sink.write("class GenCalc:\n    pass\n").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "class GenCalc:\n    pass\n"
        );
    }

    #[test]
    fn test_string_sink() {
        let mut sink = StringSink::new();
        assert_eq!(sink.text(), None);
        sink.write("x = 1\n").unwrap();
        assert_eq!(sink.into_text().as_deref(), Some("x = 1\n"));
    }
}
