use crate::error::BuildError;
use miette::SourceSpan;
use std::fs;
use std::path::{Path, PathBuf};

/// Converts a 1-based line and column into a byte offset in the source text.
/// Positions past the end of a line or of the text are clamped.
pub fn get_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut current_column = 1;
    for (i, c) in source.char_indices() {
        if current_line == line && current_column == column {
            return i;
        }
        if c == '\n' {
            if current_line == line {
                return i;
            }
            current_line += 1;
            current_column = 1;
        } else {
            current_column += 1;
        }
    }
    source.len()
}

/// Builds a span covering the whole character starting at byte `offset`,
/// or an empty span at the end of the text.
pub fn char_span(source: &str, offset: usize) -> SourceSpan {
    let len = source[offset..].chars().next().map_or(0, char::len_utf8);
    (offset, len).into()
}

/// Builds a span covering the character at the location of a YAML error,
/// or an empty span at the start of the text if the error has no location.
pub fn yaml_error_span(source: &str, err: &serde_yaml::Error) -> SourceSpan {
    match err.location() {
        Some(location) => char_span(source, get_offset(source, location.line(), location.column())),
        None => (0, 0).into(),
    }
}

/// Lists files with the given extension under `dir`, returning paths relative
/// to `dir` in sorted order. Hidden entries are skipped. A missing directory
/// yields an empty list.
pub fn list_files(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>, BuildError> {
    let mut found = Vec::new();
    if dir.is_dir() {
        visit(dir, Path::new(""), extension, recursive, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn visit(
    base: &Path,
    relative: &Path,
    extension: &str,
    recursive: bool,
    found: &mut Vec<PathBuf>,
) -> Result<(), BuildError> {
    let dir = base.join(relative);
    let entries = fs::read_dir(&dir).map_err(|e| BuildError::io(&dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::io(&dir, e))?;
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| BuildError::io(entry.path(), e))?;
        let child = relative.join(&file_name);
        if file_type.is_dir() {
            if recursive {
                visit(base, &child, extension, recursive, found)?;
            }
        } else if child.extension().is_some_and(|ext| ext == extension) {
            found.push(child);
        }
    }
    Ok(())
}
