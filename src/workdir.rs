use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum WorkdirError {
    #[error("working directory source {path} does not exist or is not a directory")]
    MissingSource { path: String },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path, source: std::io::Error) -> WorkdirError {
    WorkdirError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    pub skipped: usize,
}

/// Copies `source_root` into `dest_root`, merging into whatever is already
/// there. Entries named in `excluded_names` are skipped at every depth and
/// never descended into. Symlinks whose target exists are staged by content:
/// linked files are copied and linked directories are walked with the same
/// exclusions. Only dangling links are recreated as links.
pub fn materialize(
    source_root: &Path,
    dest_root: &Path,
    excluded_names: &[String],
) -> Result<MaterializeSummary, WorkdirError> {
    if !source_root.is_dir() {
        return Err(WorkdirError::MissingSource {
            path: source_root.display().to_string(),
        });
    }
    fs::create_dir_all(dest_root).map_err(|e| io_error(dest_root, e))?;
    let dest_canonical = fs::canonicalize(dest_root).map_err(|e| io_error(dest_root, e))?;

    let mut summary = MaterializeSummary::default();
    let mut ancestors = Vec::new();
    copy_tree(
        source_root,
        dest_root,
        &dest_canonical,
        excluded_names,
        &mut ancestors,
        &mut summary,
    )?;
    Ok(summary)
}

fn copy_tree(
    source: &Path,
    dest: &Path,
    dest_canonical: &Path,
    excluded_names: &[String],
    ancestors: &mut Vec<PathBuf>,
    summary: &mut MaterializeSummary,
) -> Result<(), WorkdirError> {
    let canonical = fs::canonicalize(source).map_err(|e| io_error(source, e))?;
    // A directory link back into a tree being copied would never end.
    if ancestors.contains(&canonical) {
        summary.skipped += 1;
        return Ok(());
    }
    ancestors.push(canonical);
    fs::create_dir_all(dest).map_err(|e| io_error(dest, e))?;

    let mut skipped = 0usize;
    let mut linked_dirs = Vec::new();
    let walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let excluded = entry
                .file_name()
                .to_str()
                .is_some_and(|name| excluded_names.iter().any(|ex| ex == name))
                // The destination may live under the source tree.
                || (entry.file_type().is_dir()
                    && fs::canonicalize(entry.path()).is_ok_and(|path| path == dest_canonical));
            if excluded {
                skipped += 1;
            }
            !excluded
        });

    for entry in walker {
        let entry = entry.map_err(|err| WorkdirError::Walk {
            path: err.path().unwrap_or(source).display().to_string(),
            source: err,
        })?;
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() => {
                    linked_dirs.push((entry.path().to_path_buf(), target));
                }
                Ok(_) => {
                    copy_file(entry.path(), &target)?;
                    summary.files += 1;
                }
                Err(_) => {
                    copy_symlink(entry.path(), &target)?;
                    summary.symlinks += 1;
                }
            }
        } else if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
            summary.directories += 1;
        } else {
            copy_file(entry.path(), &target)?;
            summary.files += 1;
        }
    }
    summary.skipped += skipped;

    for (link, target) in linked_dirs {
        replace_link_at(&target)?;
        summary.directories += 1;
        copy_tree(
            &link,
            &target,
            dest_canonical,
            excluded_names,
            ancestors,
            summary,
        )?;
    }

    ancestors.pop();
    Ok(())
}

fn copy_file(source: &Path, target: &Path) -> Result<(), WorkdirError> {
    replace_link_at(target)?;
    fs::copy(source, target).map_err(|e| io_error(target, e))?;
    Ok(())
}

fn copy_symlink(link: &Path, target: &Path) -> Result<(), WorkdirError> {
    let destination: PathBuf = fs::read_link(link).map_err(|e| io_error(link, e))?;
    if let Ok(existing) = fs::symlink_metadata(target) {
        if existing.is_dir() {
            fs::remove_dir_all(target).map_err(|e| io_error(target, e))?;
        } else {
            fs::remove_file(target).map_err(|e| io_error(target, e))?;
        }
    }
    create_symlink(&destination, target).map_err(|e| io_error(target, e))
}

/// `fs::copy` writes through an existing symlink; drop the link first so the
/// copy replaces it instead.
fn replace_link_at(target: &Path) -> Result<(), WorkdirError> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(target).map_err(|e| io_error(target, e))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn create_symlink(destination: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(destination, link)
}

/// Only dangling links reach here, so the target kind is unknown and a file
/// link is created.
#[cfg(windows)]
fn create_symlink(destination: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(destination, link)
}
