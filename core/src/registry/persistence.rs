use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::registry::error::{RegistryError, internal_error};
use crate::registry::store::RegistryState;
use crate::registry::types::{KnownFabrication, Resource, VerificationEvent};

const STATE_FORMAT_VERSION: u32 = 1;

/// The relational layout flattened to one JSON document: a `resources`
/// table, a `known_fabrications` table, and the append-only
/// `verification_log`.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryStateFile {
    version: u32,
    resources: Vec<Resource>,
    known_fabrications: Vec<KnownFabrication>,
    verification_log: Vec<VerificationEvent>,
}

impl RegistryStateFile {
    fn from_state(state: &RegistryState) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            resources: state.resources.clone(),
            known_fabrications: state.fabrications.clone(),
            verification_log: state.verification_log.clone(),
        }
    }

    fn into_state(self) -> RegistryState {
        RegistryState {
            resources: self.resources,
            fabrications: self.known_fabrications,
            verification_log: self.verification_log,
        }
    }
}

/// On-disk home of the registry. Every save lands through a temp file and a
/// rename, so a crashed writer can never leave readers a half-written store.
#[derive(Debug, Clone)]
pub struct RegistryPersistence {
    path: PathBuf,
}

impl RegistryPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// `Ok(None)` when no state file exists yet; the caller seeds instead.
    pub fn load(&self) -> Result<Option<RegistryState>, RegistryError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(internal_error(format!(
                    "registry store '{}' is unreadable: {err}",
                    self.path.display()
                )));
            }
        };

        let file: RegistryStateFile = serde_json::from_slice(&bytes).map_err(|err| {
            internal_error(format!(
                "registry store '{}' does not decode: {err}",
                self.path.display()
            ))
        })?;
        if file.version != STATE_FORMAT_VERSION {
            return Err(internal_error(format!(
                "registry store '{}' has format version {}, this build reads {}",
                self.path.display(),
                file.version,
                STATE_FORMAT_VERSION
            )));
        }

        tracing::debug!(
            target: "registry.persistence",
            resources = file.resources.len(),
            known_fabrications = file.known_fabrications.len(),
            verification_events = file.verification_log.len(),
            "registry_state_loaded"
        );
        Ok(Some(file.into_state()))
    }

    pub fn save(&self, state: &RegistryState) -> Result<(), RegistryError> {
        let file = RegistryStateFile::from_state(state);
        let mut bytes = serde_json::to_vec_pretty(&file)
            .map_err(|err| internal_error(format!("registry state does not encode: {err}")))?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RegistryError> {
    let dir = path.parent().ok_or_else(|| {
        internal_error(format!("store path '{}' has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir).map_err(|err| {
        internal_error(format!(
            "store directory '{}' could not be created: {err}",
            dir.display()
        ))
    })?;

    let tmp_path = path.with_extension("json.tmp");
    let mut tmp = fs::File::create(&tmp_path).map_err(|err| {
        internal_error(format!(
            "temp store '{}' could not be created: {err}",
            tmp_path.display()
        ))
    })?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.sync_all())
        .map_err(|err| {
            internal_error(format!(
                "temp store '{}' could not be written: {err}",
                tmp_path.display()
            ))
        })?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|err| {
        internal_error(format!(
            "store swap '{}' -> '{}' failed: {err}",
            tmp_path.display(),
            path.display()
        ))
    })
}
