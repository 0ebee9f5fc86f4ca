use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::fs;

/// Asynchronously ensures that a directory exists, creating it if it does not.
/// This function is idempotent.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).await?;
        info!("Created directory at: {:?}", path);
    }
    Ok(())
}

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
