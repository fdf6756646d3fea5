use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{DirEntry, MemoryCard, SaveEntry};
use crate::error::Result;

/// A memory card image on disk. Every operation opens the file for just as
/// long as it needs it; the handle is released when the call returns, on
/// success or error.
#[derive(Debug, Clone)]
pub struct CardImage {
    path: PathBuf,
}

impl CardImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against a read-only view of the card.
    pub fn with_card<T>(&self, f: impl FnOnce(&mut MemoryCard<File>) -> Result<T>) -> Result<T> {
        let file = File::open(&self.path)?;
        let mut card = MemoryCard::open(file)?;
        f(&mut card)
    }

    /// Runs `f` against a writable view of the card and syncs the image
    /// before returning.
    pub fn with_card_mut<T>(
        &self,
        f: impl FnOnce(&mut MemoryCard<File>) -> Result<T>,
    ) -> Result<T> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let mut card = MemoryCard::open(file)?;
        let out = f(&mut card)?;
        card.into_inner().sync_all()?;
        Ok(out)
    }

    pub fn list_root_dir(&self) -> Result<Vec<DirEntry>> {
        self.with_card(|card| card.list_root_dir())
    }

    pub fn save_names(&self) -> Result<Vec<String>> {
        self.with_card(|card| card.save_names())
    }

    pub fn read_save_entry(&self, name: &str) -> Result<SaveEntry> {
        self.with_card(|card| card.read_save_entry(name))
    }

    pub fn read_save_entries(&self) -> Result<Vec<SaveEntry>> {
        self.with_card(|card| card.read_save_entries())
    }

    pub fn write_save_entry(&self, name: &str, main: &[u8], head: Option<&[u8]>) -> Result<()> {
        self.with_card_mut(|card| card.write_save_entry(name, main, head))?;
        info!(path = %self.path.display(), save = name, "wrote save back to card image");
        Ok(())
    }
}
