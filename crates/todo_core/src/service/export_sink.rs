//! Destinations for export files.
//!
//! # Responsibility
//! - Accept named export files from manual export and auto-backup.
//! - Keep the medium swappable (directory on disk, process memory).

use crate::codec::document::ExportFile;
use log::info;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

/// Receives encoded export files.
pub trait ExportSink {
    fn write(&mut self, file: &ExportFile) -> io::Result<()>;
}

/// Writes export files into one directory, creating it on first use.
///
/// A file with the same name is replaced.
#[derive(Debug, Clone)]
pub struct DirectoryExportSink {
    dir: PathBuf,
}

impl DirectoryExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for DirectoryExportSink {
    fn write(&mut self, file: &ExportFile) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.file_name);
        fs::write(&path, file.contents.as_bytes())?;
        info!(
            "event=export_write module=export status=ok bytes={} path={}",
            file.contents.len(),
            path.display()
        );
        Ok(())
    }
}

/// Keeps written files in memory; clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryExportSink {
    files: Rc<RefCell<Vec<ExportFile>>>,
}

impl MemoryExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files written so far, oldest first.
    pub fn files(&self) -> Vec<ExportFile> {
        self.files.borrow().clone()
    }
}

impl ExportSink for MemoryExportSink {
    fn write(&mut self, file: &ExportFile) -> io::Result<()> {
        self.files.borrow_mut().push(file.clone());
        Ok(())
    }
}
