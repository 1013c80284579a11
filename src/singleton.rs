//! Single-instance guard.
//!
//! dashpad binds whatever port the scan finds, so a second launch cannot
//! know where the first one lives. The running instance holds an exclusive
//! lock on a well-known file and writes its bound port into it; a later
//! launch reads the port back and reports the running dashboard's URL
//! instead of serving a second copy.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Holds the instance lock for the lifetime of the process.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
}

impl InstanceLock {
    /// Record the bound port so later launches can point at the running UI.
    pub fn record_port(&mut self, port: u16) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        writeln!(self.file, "{port}")?;
        self.file.flush()?;
        Ok(())
    }
}

fn default_lock_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine runtime directory"))?;

    let dir = runtime_dir.join("dashpad");
    fs::create_dir_all(&dir)?;

    Ok(dir.join("instance"))
}

/// Take the instance lock, or explain where the running instance is.
pub fn acquire_lock() -> Result<InstanceLock> {
    acquire_lock_at(&default_lock_path()?)
}

fn acquire_lock_at(path: &Path) -> Result<InstanceLock> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .context("Failed to create lock file")?;

    if file.try_lock_exclusive().is_err() {
        match running_port(path) {
            Some(port) => bail!(
                "dashpad is already running at http://127.0.0.1:{port} - open that URL instead"
            ),
            None => bail!("Another dashpad instance is already starting up"),
        }
    }

    Ok(InstanceLock { file })
}

/// Port recorded by a running instance, if it got that far.
fn running_port(path: &Path) -> Option<u16> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
