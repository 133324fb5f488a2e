use crate::error::{BuildError, CollectError};
use crate::naming::module_name;
use crate::utils::list_files;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A named, includable unit of SQL as served by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlModule {
    pub name: String,
    pub sql: String,
}

/// Collects every `.sql` file below `dir` (recursively) into SQL modules
/// sorted by name. Line endings are normalized to `\n` and trailing
/// newlines are stripped from the SQL text.
///
/// # Errors
/// Returns an error if a file cannot be read, a path does not map to a valid
/// name, or two files map to the same name.
pub fn collect_sql_modules(dir: &Path, namespace: &str) -> Result<Vec<SqlModule>, BuildError> {
    let mut modules: BTreeMap<String, (PathBuf, String)> = BTreeMap::new();
    for relative in list_files(dir, "sql", true)? {
        let name = module_name(namespace, &relative)?;
        let path = dir.join(&relative);
        let sql = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        log::debug!("SQL module {name} from {}", path.display());

        if let Some((first, _)) = modules.get(&name) {
            return Err(CollectError::DuplicateName {
                kind: "SQL module",
                name,
                first: first.clone(),
                second: path,
            }
            .into());
        }
        let sql = normalize_newlines(&sql).trim_end_matches('\n').to_string();
        modules.insert(name, (path, sql));
    }

    Ok(modules
        .into_iter()
        .map(|(name, (_, sql))| SqlModule { name, sql })
        .collect())
}

// `\r\n` and lone `\r` both become `\n`.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
