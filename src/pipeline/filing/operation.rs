//! Filing state machine: PLANNED → {PENDING, FILED}.
//!
//! Disk mutation (mkdir, one move, one sidecar write) happens only on the
//! transition to FILED.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use super::path_builder::{unique_path, PathBuilder, PathPlan};
use super::FilingError;
use crate::config::AppConfig;
use crate::models::Metadata;
use crate::pipeline::naming::sidecar_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingState {
    /// Dry run: nothing touched.
    Planned,
    /// Destination folders missing and not approved.
    Pending,
    Filed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingResult {
    pub state: FilingState,
    /// Planned (or, once filed, actual) destination.
    pub destination: PathBuf,
    /// Where the document is on disk after this call.
    pub path: PathBuf,
    pub missing: Vec<String>,
    /// Creation of missing folders was approved during this call.
    pub confirmed: bool,
}

pub struct FilingOperation {
    builder: PathBuilder,
}

impl FilingOperation {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            builder: PathBuilder::new(config),
        }
    }

    pub fn plan(&self, source: &Path, metadata: &Metadata) -> PathPlan {
        self.builder.build(metadata, source)
    }

    /// Run the state machine. `confirm` is only consulted when folders are
    /// missing and `metadata.needs_new_folder` is set.
    pub fn execute<F>(
        &self,
        source: &Path,
        metadata: &Metadata,
        dry_run: bool,
        confirm: F,
    ) -> Result<FilingResult, FilingError>
    where
        F: FnOnce(&[String]) -> bool,
    {
        let plan = self.plan(source, metadata);

        if dry_run {
            tracing::info!(
                file = %source.display(),
                destination = %plan.destination.display(),
                missing = ?plan.missing,
                "Dry run, would file document"
            );
            return Ok(FilingResult {
                state: FilingState::Planned,
                destination: plan.destination,
                path: source.to_path_buf(),
                missing: plan.missing,
                confirmed: false,
            });
        }

        if !source.is_file() {
            return Err(FilingError::SourceMissing(source.to_path_buf()));
        }

        if plan.missing.is_empty() {
            return self.file(source, metadata, plan, false);
        }

        let approved = metadata.needs_new_folder && confirm(&plan.missing);
        if !approved {
            tracing::info!(
                file = %source.display(),
                missing = ?plan.missing,
                "Destination folders missing, document pending"
            );
            return Ok(FilingResult {
                state: FilingState::Pending,
                destination: plan.destination,
                path: source.to_path_buf(),
                missing: plan.missing,
                confirmed: false,
            });
        }

        self.file(source, metadata, plan, true)
    }

    /// File with folder creation already approved (review finalize).
    pub fn execute_approved(
        &self,
        source: &Path,
        metadata: &Metadata,
    ) -> Result<FilingResult, FilingError> {
        if !source.is_file() {
            return Err(FilingError::SourceMissing(source.to_path_buf()));
        }
        let plan = self.plan(source, metadata);
        let confirmed = !plan.missing.is_empty();
        self.file(source, metadata, plan, confirmed)
    }

    fn file(
        &self,
        source: &Path,
        metadata: &Metadata,
        plan: PathPlan,
        confirmed: bool,
    ) -> Result<FilingResult, FilingError> {
        if !plan.destination.starts_with(self.builder.archive_root()) {
            return Err(FilingError::OutsideArchive(plan.destination));
        }

        fs::create_dir_all(plan.directory())?;
        if confirmed {
            tracing::info!(created = ?plan.missing, "Created archive folders");
        }

        let destination = move_to_free_path(source, &plan.destination)?;
        if let Err(e) = write_sidecar(&destination, metadata) {
            roll_back(&destination, source);
            return Err(e);
        }

        tracing::info!(
            file = %source.display(),
            destination = %destination.display(),
            "Document filed"
        );
        Ok(FilingResult {
            state: FilingState::Filed,
            destination: destination.clone(),
            path: destination,
            missing: Vec::new(),
            confirmed,
        })
    }
}

/// Move `source` to `planned`, or to the next free `_N` name if another
/// writer took it since planning. Never overwrites.
pub(crate) fn move_to_free_path(source: &Path, planned: &Path) -> Result<PathBuf, FilingError> {
    loop {
        let destination = unique_path(planned);
        match claim(source, &destination) {
            Ok(()) => return Ok(destination),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Put a filed document back at `source` after its sidecar could not be
/// written. Failures are logged; the caller reports the original error.
fn roll_back(destination: &Path, source: &Path) {
    let sidecar = sidecar_path(destination);
    if let Err(e) = fs::remove_file(&sidecar) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(sidecar = %sidecar.display(), error = %e, "Cannot remove partial sidecar");
        }
    }
    match move_to_free_path(destination, source) {
        Ok(restored) => {
            tracing::warn!(file = %restored.display(), "Filing rolled back");
        }
        Err(e) => {
            tracing::error!(
                file = %destination.display(),
                error = %e,
                "Filing roll-back failed, document left in archive"
            );
        }
    }
}

/// Hard link then unlink; across filesystems, copy into a new file.
fn claim(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::hard_link(source, destination) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(e),
        Err(_) => {
            let mut input = File::open(source)?;
            let mut target = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(destination)?;
            io::copy(&mut input, &mut target)?;
        }
    }
    fs::remove_file(source)
}

/// Pretty UTF-8 JSON at `{path}.json`.
pub fn write_sidecar(path: &Path, metadata: &Metadata) -> Result<PathBuf, FilingError> {
    let sidecar = sidecar_path(path);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&sidecar, json)?;
    tracing::debug!(sidecar = %sidecar.display(), "Sidecar written");
    Ok(sidecar)
}
