use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR_NAME: &str = ".meeting-agent";

pub const INDEX_DIR_NAME: &str = "index";
pub const DOCUMENTS_FILE_NAME: &str = "documents.json";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const RECORDS_FILE_NAME: &str = "records.json";
pub const LOCK_FILE_NAME: &str = "catalog.lock";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Directory holding the persisted semantic index.
/// Its existence decides between loading and building at startup.
#[must_use]
pub fn index_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_DIR_NAME)
}

#[must_use]
pub fn records_path(data_dir: &Path) -> PathBuf {
    data_dir.join(RECORDS_FILE_NAME)
}

#[must_use]
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOCK_FILE_NAME)
}

#[must_use]
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}
