//! Diff between the remote catalog and the local archive tree.

use nwp_sync_archive_models::{ArchiveLayout, RemoteFileName};

use crate::ArchiveError;

/// Returns the catalog entries that have no file at their layout path.
///
/// Each entry costs one `stat` of its expected path; directories are never
/// listed. The input order is preserved and nothing is modified, so calling
/// this twice without intervening writes yields the same result.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the existence of a path cannot be
/// determined (e.g. permission denied on its month directory).
pub fn missing_files(
    layout: &ArchiveLayout,
    catalog: &[RemoteFileName],
) -> Result<Vec<RemoteFileName>, ArchiveError> {
    log::debug!("Checking for missing files...");

    let mut missing = Vec::new();
    for name in catalog {
        let candidate = layout.path_for(name);
        let present = candidate
            .try_exists()
            .map_err(ArchiveError::io(&candidate))?;
        if !present {
            missing.push(name.clone());
        }
    }

    log::info!(
        "Checked {} files: {} missing, {} already present",
        catalog.len(),
        missing.len(),
        catalog.len() - missing.len()
    );
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<RemoteFileName> {
        raw.iter().map(|n| RemoteFileName::new(*n).unwrap()).collect()
    }

    #[test]
    fn everything_missing_in_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());
        let catalog = names(&["nwp_2024010100.nc", "nwp_2023120100.nc"]);

        let missing = missing_files(&layout, &catalog).unwrap();

        assert_eq!(missing, catalog);
    }

    #[test]
    fn skips_present_files_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());
        let catalog = names(&[
            "nwp_2024020100.nc",
            "nwp_2024010100.nc",
            "nwp_2023120100.nc",
        ]);

        let present = layout.path_for(&catalog[1]);
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, b"data").unwrap();

        let missing = missing_files(&layout, &catalog).unwrap();

        assert_eq!(missing, names(&["nwp_2024020100.nc", "nwp_2023120100.nc"]));
    }

    #[test]
    fn partial_download_does_not_count_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());
        let catalog = names(&["nwp_2024010100.nc"]);

        let partial = layout.partial_path_for(&catalog[0], "1-0");
        std::fs::create_dir_all(partial.parent().unwrap()).unwrap();
        std::fs::write(&partial, b"half").unwrap();

        assert_eq!(missing_files(&layout, &catalog).unwrap(), catalog);
    }

    #[test]
    fn repeated_inspection_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());
        let catalog = names(&["nwp_2024010100.nc", "nwp_2023120100.nc"]);

        let present = layout.path_for(&catalog[0]);
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, b"data").unwrap();

        let first = missing_files(&layout, &catalog).unwrap();
        let second = missing_files(&layout, &catalog).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, names(&["nwp_2023120100.nc"]));
    }
}
