use crate::{CatalogError, Result};
use fs2::FileExt;
use meeting_vector_store::lock_path;
use std::path::Path;

/// Exclusive ownership of a data directory for the lifetime of the catalog.
pub(crate) struct CatalogLock {
    file: std::fs::File,
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) async fn acquire_catalog_lock(data_dir: &Path) -> Result<CatalogLock> {
    let path = lock_path(data_dir);
    tokio::fs::create_dir_all(data_dir).await?;

    tokio::task::spawn_blocking(move || -> Result<CatalogLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                CatalogError::Other(format!("open catalog lock {}: {err}", path.display()))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(CatalogLock { file }),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                log::debug!("catalog lock {} busy: {err}", path.display());
                Err(CatalogError::Locked(path))
            }
            Err(err) => Err(CatalogError::Other(format!(
                "acquire catalog lock {}: {err}",
                path.display()
            ))),
        }
    })
    .await
    .map_err(|err| CatalogError::Other(format!("join catalog lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn second_lock_fails_until_first_is_dropped() {
        let temp = TempDir::new().unwrap();
        let first = acquire_catalog_lock(temp.path()).await.unwrap();

        let second = acquire_catalog_lock(temp.path()).await;
        assert!(matches!(second, Err(CatalogError::Locked(_))));

        drop(first);
        assert!(acquire_catalog_lock(temp.path()).await.is_ok());
    }
}
