//! Derivation of fully-qualified names from source file paths.
//!
//! SQL modules are named after their path below `sql_modules/`, macros after
//! their path below `macros/` with every segment converted to PascalCase. Both
//! are prefixed with the extension namespace.

use crate::error::NamingError;
use std::path::{Component, Path};

/// Returns the fully-qualified name of the SQL module at `relative_path`.
///
/// The file extension is stripped and path separators become dots:
/// `foo/bar.sql` in namespace `com.example.myext` is `com.example.myext.foo.bar`.
///
/// # Errors
/// Returns a `NamingError` if a path segment is empty, contains a dot, is not
/// UTF-8, or the path is not a plain relative path.
pub fn module_name(namespace: &str, relative_path: impl AsRef<Path>) -> Result<String, NamingError> {
    let segments = path_segments(relative_path.as_ref())?;
    Ok(qualify(namespace, &segments))
}

/// Returns the fully-qualified id of the macro defined at `relative_path`.
///
/// Every segment is converted to PascalCase: `trace/show_slices.yaml` in
/// namespace `com.example.myext` is `com.example.myext.Trace.ShowSlices`.
///
/// # Errors
/// Same conditions as [`module_name`], plus a segment that is empty once
/// converted (e.g. `_.yaml`).
pub fn macro_id(namespace: &str, relative_path: impl AsRef<Path>) -> Result<String, NamingError> {
    let path = relative_path.as_ref();
    let segments = path_segments(path)?
        .iter()
        .map(|segment| {
            let pascal = to_pascal_case(segment);
            if pascal.is_empty() {
                Err(NamingError::EmptyComponent {
                    path: path.display().to_string(),
                })
            } else {
                Ok(pascal)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(qualify(namespace, &segments))
}

/// Converts a snake_case name to PascalCase, e.g. `show_all_slices` to
/// `ShowAllSlices`. Each word keeps its first character uppercased and the
/// rest lowercased.
pub fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Returns true if `segment` is a non-empty ASCII identifier.
pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn qualify(namespace: &str, segments: &[String]) -> String {
    let mut name = String::from(namespace);
    for segment in segments {
        name.push('.');
        name.push_str(segment);
    }
    name
}

fn path_segments(path: &Path) -> Result<Vec<String>, NamingError> {
    let display = || path.display().to_string();
    let components: Vec<_> = path.components().collect();
    if components.is_empty() {
        return Err(NamingError::EmptyComponent { path: display() });
    }

    let last = components.len() - 1;
    let mut segments = Vec::with_capacity(components.len());
    for (i, component) in components.into_iter().enumerate() {
        let Component::Normal(os_segment) = component else {
            return Err(NamingError::NotRelative { path: display() });
        };
        let mut segment = os_segment
            .to_str()
            .ok_or_else(|| NamingError::NotUtf8 { path: display() })?;
        if i == last {
            segment = Path::new(segment)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
        }
        if segment.is_empty() {
            return Err(NamingError::EmptyComponent { path: display() });
        }
        if segment.contains('.') {
            return Err(NamingError::DottedComponent {
                path: display(),
                component: segment.to_string(),
            });
        }
        segments.push(segment.to_string());
    }
    Ok(segments)
}
