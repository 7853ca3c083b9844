//! The plain-text copy of the roster kept next to the database.
//!
//! The file has a single `names` column, one cadet per row, sorted. Writes to
//! it are best effort: a failure is handed back as a warning and never undoes
//! the roster change that triggered it.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{MusterError, MusterResult};
use crate::util::names_match;

pub const NAMES_HEADER: &str = "names";
const ACCEPTED_HEADERS: [&str; 3] = ["names", "name", "Name"];

/// A committed value plus the mirror warning produced while syncing it, if any.
#[derive(Debug)]
pub struct Synced<T> {
    pub value: T,
    pub warning: Option<MusterError>,
}

impl<T> Synced<T> {
    pub fn new(value: T, sync_result: MusterResult<()>) -> Self {
        let warning = sync_result.err().map(|err| match err {
            MusterError::MirrorSync(reason) => MusterError::MirrorSync(reason),
            other => MusterError::MirrorSync(other.to_string()),
        });
        if let Some(warning) = &warning {
            tracing::warn!(%warning, "roster mirror out of date");
        }

        Self { value, warning }
    }

    pub fn warning_message(&self) -> Option<String> {
        self.warning.as_ref().map(ToString::to_string)
    }
}

#[derive(Clone, Debug)]
pub struct RosterMirror {
    path: PathBuf,
}

impl RosterMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// The names in the file, in file order. A missing file reads as empty.
    pub fn read_names(&self) -> MusterResult<Vec<String>> {
        if !self.exists() {
            return Ok(vec![]);
        }

        let file = std::fs::File::open(&self.path).map_err(|err| {
            MusterError::MirrorSync(format!("couldn't open {}: {}", self.path.display(), err))
        })?;
        parse_names(file)
    }

    /// Rewrites the file with the given names, sorted ascending.
    pub fn write_names(&self, names: &[String]) -> MusterResult<()> {
        let mut names = names.to_vec();
        names.sort();

        let mut writer = csv::Writer::from_path(&self.path)
            .map_err(|err| MusterError::MirrorSync(err.to_string()))?;
        writer
            .write_record([NAMES_HEADER])
            .map_err(|err| MusterError::MirrorSync(err.to_string()))?;
        for name in &names {
            writer
                .write_record([name])
                .map_err(|err| MusterError::MirrorSync(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| MusterError::MirrorSync(err.to_string()))
    }

    pub fn add(&self, name: &str) -> MusterResult<()> {
        let mut names = self.read_names()?;
        names.push(name.to_owned());
        self.write_names(&names)
    }

    pub fn remove(&self, name: &str) -> MusterResult<()> {
        let names = self
            .read_names()?
            .into_iter()
            .filter(|existing| !names_match(existing, name))
            .collect::<Vec<_>>();
        self.write_names(&names)
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> MusterResult<()> {
        let mut names = self
            .read_names()?
            .into_iter()
            .filter(|existing| !names_match(existing, old_name))
            .collect::<Vec<_>>();
        names.push(new_name.to_owned());
        self.write_names(&names)
    }
}

/// Reads the name column of a roster file, skipping blank rows.
pub fn parse_names<R: Read>(reader: R) -> MusterResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let column = ACCEPTED_HEADERS
        .iter()
        .find_map(|accepted| headers.iter().position(|header| header.trim() == *accepted));
    let column = match column {
        Some(column) => column,
        None => return Ok(vec![]),
    };

    let mut names = vec![];
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(column).map(str::trim) {
            if !name.is_empty() {
                names.push(name.to_owned());
            }
        }
    }

    Ok(names)
}
