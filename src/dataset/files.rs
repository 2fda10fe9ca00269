//! Audio file discovery and train/validation splitting.

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Recursively collect files under `directory` whose names match `pattern`.
///
/// `pattern` uses fnmatch-style wildcards (`*` and `?`). The result is sorted so
/// that discovery order does not depend on the file system.
pub fn find_files(directory: impl AsRef<Path>, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    visit(directory.as_ref(), pattern, &mut files)?;
    files.sort();
    Ok(files)
}

fn visit(dir: &Path, pattern: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err)?;
        if file_type.is_dir() {
            visit(&path, pattern, files)?;
        } else if entry
            .file_name()
            .to_str()
            .is_some_and(|name| matches_pattern(name, pattern))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// fnmatch-style match supporting `*` (any run) and `?` (any single character).
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut n, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                n += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Disjoint partition of the discovered files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Vec<PathBuf>,
    pub validation: Vec<PathBuf>,
}

impl DatasetSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discover, shuffle and split the files under `directory`.
///
/// The first `floor((1 - validation_fraction) * N)` shuffled files form the
/// training set and the remainder the validation set.
///
/// # Errors
///
/// [`Error::EmptyDataset`] when nothing matches, [`Error::InvalidConfig`] when the
/// fraction lies outside `[0, 1]`.
pub fn split_files<R: Rng + ?Sized>(
    directory: impl AsRef<Path>,
    pattern: &str,
    validation_fraction: f64,
    rng: &mut R,
) -> Result<DatasetSplit> {
    if !(0.0..=1.0).contains(&validation_fraction) {
        return Err(Error::InvalidConfig(format!(
            "validation fraction must be within [0, 1], got {validation_fraction}"
        )));
    }
    let directory = directory.as_ref();
    let mut files = discover(directory, pattern)?;
    files.shuffle(rng);

    let split_at = ((1.0 - validation_fraction) * files.len() as f64).floor() as usize;
    let validation = files.split_off(split_at.min(files.len()));
    log::debug!(
        "split {} files from '{}' into {} train / {} validation",
        files.len() + validation.len(),
        directory.display(),
        files.len(),
        validation.len()
    );
    Ok(DatasetSplit {
        train: files,
        validation,
    })
}

/// Like [`find_files`], but an empty result is [`Error::EmptyDataset`].
pub(crate) fn discover(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let files = find_files(directory, pattern)?;
    if files.is_empty() {
        return Err(Error::EmptyDataset {
            dir: directory.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    Ok(files)
}
