//! Scratch locations for stores and NetCDF files.

use std::path::PathBuf;

use tempfile::TempDir;

/// A temporary directory that is removed when dropped.
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("agroclim-test-")
        .tempdir()
        .expect("create scratch dir")
}

/// Path of a store database inside `dir`. The file is not created.
pub fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("climate.db")
}

/// Path of a NetCDF file inside `dir`. The file is not created.
pub fn netcdf_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.nc", name))
}
