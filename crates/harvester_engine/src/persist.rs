use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use engine_logging::{engine_debug, engine_info};
use harvester_core::UniqueLinkSet;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::dated_filename;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot use output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write links file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One link per line, `\n`-separated, no trailing newline.
pub fn render_link_list(links: &UniqueLinkSet) -> String {
    links.iter().collect::<Vec<_>>().join("\n")
}

/// Saves a harvest as `links_<date>.txt` inside one output directory.
///
/// The list is staged in a temp file next to the target and renamed over it,
/// so readers see either the previous file or the complete new one.
pub struct LinkFileWriter {
    dir: PathBuf,
}

impl LinkFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(dated_filename(date))
    }

    pub fn write(&self, date: NaiveDate, links: &UniqueLinkSet) -> Result<PathBuf, PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::OutputDir {
            path: self.dir.clone(),
            source,
        })?;

        let target = self.path_for(date);
        let write_err = |source| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut staged = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        staged
            .write_all(render_link_list(links).as_bytes())
            .map_err(write_err)?;
        staged.as_file_mut().sync_all().map_err(write_err)?;
        engine_debug!("staged {} urls in {:?}", links.len(), staged.path());

        staged
            .persist(&target)
            .map_err(|err| write_err(err.error))?;
        Ok(target)
    }
}

/// Writes `links` to `{dir}/links_{date}.txt`, replacing any file of that name.
pub fn write_link_list(
    dir: &Path,
    date: NaiveDate,
    links: &UniqueLinkSet,
) -> Result<PathBuf, PersistError> {
    let path = LinkFileWriter::new(dir).write(date, links)?;
    engine_info!("saved {} urls to {}", links.len(), path.display());
    Ok(path)
}
