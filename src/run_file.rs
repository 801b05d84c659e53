use std::path::PathBuf;

/// A sorted run persisted to disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RunFile {
    path: PathBuf,
    records: usize,
}

impl RunFile {
    pub(crate) fn new(path: PathBuf, records: usize) -> RunFile {
        RunFile {
            path,
            records,
        }
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }

    pub(crate) fn records(&self) -> usize {
        self.records
    }
}

/// Remove run files, ignoring the ones that are already gone
pub(crate) fn remove_run_files<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                log::debug!("Removed run file {}", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!("Failed to remove run file {}: {}", path.display(), e);
            }
        }
    }
}
