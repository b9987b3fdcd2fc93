//! Migration system for discovering and applying SQL change scripts.
//!
//! Each script is a `.sql` file somewhere under the migrations directory.
//! Scripts are applied in lexicographic order of their full path and tracked
//! by base name in the `migrations` ledger table (see [`crate::ledger`]).

use std::collections::HashSet;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info};

use crate::ledger;

pub const SCRIPT_SUFFIX: &str = ".sql";

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("migrations directory does not exist: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to list migration scripts under {}: {source}", path.display())]
    DiscoveryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate migration name {name}: {} and {}", first.display(), second.display())]
    DuplicateScriptName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to create migrations table: {0}")]
    LedgerBootstrapFailed(#[source] rusqlite::Error),

    #[error("failed to get applied migrations: {0}")]
    LedgerReadFailed(#[source] rusqlite::Error),

    #[error("failed to read migration file {name}: {source}")]
    ScriptReadFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to begin transaction for migration {name}: {source}")]
    TransactionFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply migration {name}: {source}")]
    ScriptExecutionFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to record migration {name}: {source}")]
    LedgerWriteFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to commit migration {name}: {source}")]
    CommitFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl MigrationError {
    /// The script a failure is attributed to, if any.
    pub fn script_name(&self) -> Option<&str> {
        match self {
            Self::ScriptReadFailed { name, .. }
            | Self::TransactionFailed { name, .. }
            | Self::ScriptExecutionFailed { name, .. }
            | Self::LedgerWriteFailed { name, .. }
            | Self::CommitFailed { name, .. }
            | Self::DuplicateScriptName { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<MigrationError> for fleetroute_common::Error {
    fn from(e: MigrationError) -> Self {
        Self::Migration(e.to_string())
    }
}

/// A discovered script. The body is read only when the script is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    /// Base file name; the ledger key.
    pub name: String,
    pub path: PathBuf,
}

impl MigrationScript {
    pub fn read_body(&self) -> Result<String, MigrationError> {
        std::fs::read_to_string(&self.path).map_err(|source| MigrationError::ScriptReadFailed {
            name: self.name.clone(),
            source,
        })
    }
}

/// Outcome of one successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// List every `.sql` file under `dir`, recursively, sorted by full path.
pub fn discover_scripts(dir: &Path) -> Result<Vec<MigrationScript>, MigrationError> {
    if let Err(source) = std::fs::metadata(dir) {
        return Err(match source.kind() {
            ErrorKind::NotFound => MigrationError::DirectoryNotFound {
                path: dir.to_path_buf(),
            },
            _ => MigrationError::DiscoveryFailed {
                path: dir.to_path_buf(),
                source,
            },
        });
    }

    let mut paths = Vec::new();
    collect_scripts_recursive(dir, &mut paths)?;
    // Byte-wise on the whole path, not per component.
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    let mut scripts: Vec<MigrationScript> = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(existing) = scripts.iter().find(|s| s.name == name) {
            return Err(MigrationError::DuplicateScriptName {
                name,
                first: existing.path.clone(),
                second: path,
            });
        }
        scripts.push(MigrationScript { name, path });
    }

    Ok(scripts)
}

fn collect_scripts_recursive(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), MigrationError> {
    let io_err = |source| MigrationError::DiscoveryFailed {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        // Symlinked directories are not descended into.
        let file_type = entry.file_type().map_err(io_err)?;

        if file_type.is_dir() {
            collect_scripts_recursive(&entry.path(), paths)?;
        } else if is_script(&entry.file_name()) {
            paths.push(entry.path());
        }
    }

    Ok(())
}

fn is_script(file_name: &OsStr) -> bool {
    file_name
        .as_encoded_bytes()
        .ends_with(SCRIPT_SUFFIX.as_bytes())
}

/// Applies pending scripts against an injected connection.
pub struct MigrationRunner<'c> {
    conn: &'c mut Connection,
}

impl<'c> MigrationRunner<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    /// Scripts under `dir` whose names are not yet in the ledger.
    ///
    /// Read-only: a database without a ledger reports every script as pending.
    pub fn plan(&self, dir: &Path) -> Result<Vec<MigrationScript>, MigrationError> {
        let scripts = discover_scripts(dir)?;
        let applied: HashSet<String> = if ledger::ledger_exists(self.conn)? {
            ledger::list_applied_names(self.conn)?.into_iter().collect()
        } else {
            HashSet::new()
        };

        Ok(scripts
            .into_iter()
            .filter(|s| !applied.contains(&s.name))
            .collect())
    }

    /// Apply every pending script under `dir`, one transaction per script.
    ///
    /// Stops at the first failure; scripts sorted after it are not attempted.
    pub fn run(&mut self, dir: &Path) -> Result<RunReport, MigrationError> {
        // Discovery first so a bad path fails before the ledger is touched.
        let scripts = discover_scripts(dir)?;

        ledger::ensure_ledger_exists(self.conn)?;
        let applied: HashSet<String> = ledger::list_applied_names(self.conn)?
            .into_iter()
            .collect();

        let mut report = RunReport::default();
        for script in scripts {
            if applied.contains(&script.name) {
                info!("migration already applied: {}", script.name);
                report.skipped.push(script.name);
                continue;
            }

            self.apply(&script)?;
            info!("applied migration: {}", script.name);
            report.applied.push(script.name);
        }

        if report.is_noop() {
            debug!("no pending migrations in {}", dir.display());
        }
        Ok(report)
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<(), MigrationError> {
        let body = script.read_body()?;

        // Dropping `tx` on any early return rolls it back.
        let tx = self
            .conn
            .transaction()
            .map_err(|source| MigrationError::TransactionFailed {
                name: script.name.clone(),
                source,
            })?;

        tx.execute_batch(&body)
            .map_err(|source| MigrationError::ScriptExecutionFailed {
                name: script.name.clone(),
                source,
            })?;

        ledger::record_applied(&tx, &script.name)?;

        tx.commit().map_err(|source| MigrationError::CommitFailed {
            name: script.name.clone(),
            source,
        })
    }
}
