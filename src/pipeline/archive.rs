use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::Pattern;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Names never shipped to the build context, matched against each path
/// component
pub const EXCLUDES: [&str; 11] = [
    ".venv",
    "venv",
    "__pycache__",
    "*.pyc",
    ".git",
    "node_modules",
    ".pytest_cache",
    "staticfiles",
    "media",
    "target",
    "*.sqlite3",
];

fn exclude_patterns() -> Result<Vec<Pattern>> {
    EXCLUDES
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern: {}", p)))
        .collect()
}

/// Write a gzipped tarball of `root` to `dest`, returning the number of
/// files it holds. Entries are relative to `root`.
pub fn build(root: &Path, dest: &Path) -> Result<usize> {
    let excludes = exclude_patterns()?;
    let file = File::create(dest)
        .with_context(|| format!("Failed to create archive: {}", dest.display()))?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut files = 0;
    append_tree(&mut builder, root, Path::new(""), &excludes, dest, &mut files)
        .with_context(|| format!("Failed to archive {}", root.display()))?;

    let encoder = builder
        .into_inner()
        .context("Failed to finish project archive")?;
    encoder
        .finish()
        .context("Failed to finish archive compression")?;

    tracing::debug!(root = %root.display(), files, "built project archive");
    Ok(files)
}

fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    dir: &Path,
    relative: &Path,
    excludes: &[Pattern],
    skip: &Path,
    files: &mut usize,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        if excludes.iter().any(|p| p.matches(&name.to_string_lossy())) {
            continue;
        }

        let path = entry.path();
        if path == skip {
            continue;
        }

        let entry_name = relative.join(&name);
        if entry.file_type()?.is_dir() {
            builder.append_dir(&entry_name, &path)?;
            append_tree(builder, &path, &entry_name, excludes, skip, files)?;
        } else {
            builder.append_path_with_name(&path, &entry_name)?;
            *files += 1;
        }
    }

    Ok(())
}
