use crate::error::{BuildError, CollectError};
use crate::naming::macro_id;
use crate::utils::{list_files, yaml_error_span};
use miette::NamedSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A UI macro as served by the endpoint: a named list of commands run in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macro {
    pub id: String,
    pub name: String,
    pub run: Vec<MacroCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroCommand {
    pub id: String,
    pub args: Vec<Value>,
}

// Shape of a macro source file. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct MacroSource {
    name: String,
    #[serde(default)]
    commands: Vec<CommandSource>,
}

#[derive(Debug, Deserialize)]
struct CommandSource {
    id: String,
    #[serde(default)]
    args: Vec<Value>,
}

/// Parses the text of a macro file into a `Macro` with the given id.
///
/// # Errors
/// Returns `CollectError::MalformedMacro` pointing at the offending location.
pub fn parse_macro(id: String, source: &str, file_name: &str) -> Result<Macro, CollectError> {
    let parsed: MacroSource =
        serde_yaml::from_str(source).map_err(|err| CollectError::MalformedMacro {
            src: NamedSource::new(file_name, source.to_string()),
            span: yaml_error_span(source, &err),
            message: err.to_string(),
        })?;

    Ok(Macro {
        id,
        name: parsed.name,
        run: parsed
            .commands
            .into_iter()
            .map(|command| MacroCommand {
                id: command.id,
                args: command.args,
            })
            .collect(),
    })
}

/// Collects every `.yaml` file below `dir` (recursively) into macros sorted
/// by id.
///
/// # Errors
/// Returns an error if a file cannot be read or parsed, a path does not map
/// to a valid id, or two files map to the same id.
pub fn collect_macros(dir: &Path, namespace: &str) -> Result<Vec<Macro>, BuildError> {
    let mut macros: BTreeMap<String, (PathBuf, Macro)> = BTreeMap::new();
    for relative in list_files(dir, "yaml", true)? {
        let id = macro_id(namespace, &relative)?;
        let path = dir.join(&relative);
        if let Some((first, _)) = macros.get(&id) {
            return Err(CollectError::DuplicateName {
                kind: "macro",
                name: id,
                first: first.clone(),
                second: path,
            }
            .into());
        }

        let source = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let parsed = parse_macro(id.clone(), &source, &path.display().to_string())?;
        log::debug!("Macro {id} ({} commands) from {}", parsed.run.len(), path.display());
        macros.insert(id, (path, parsed));
    }

    Ok(macros.into_values().map(|(_, parsed)| parsed).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SHOW_SLICES: &str = r#"
name: Show long slices
description: ignored
commands:
  - id: dev.perfetto.RunQuery
    args: ["select * from slice where dur > 1e6", 10]
  - id: dev.perfetto.PinTrack
"#;

    #[test]
    fn test_parse_macro() {
        let parsed = parse_macro("ns.ShowSlices".to_string(), SHOW_SLICES, "show_slices.yaml").unwrap();
        assert_eq!(parsed.id, "ns.ShowSlices");
        assert_eq!(parsed.name, "Show long slices");
        assert_eq!(parsed.run.len(), 2);
        assert_eq!(parsed.run[0].id, "dev.perfetto.RunQuery");
        assert_eq!(
            parsed.run[0].args,
            vec![json!("select * from slice where dur > 1e6"), json!(10)]
        );
        assert!(parsed.run[1].args.is_empty());
    }

    #[test]
    fn test_parse_macro_without_commands() {
        let parsed = parse_macro("ns.Empty".to_string(), "name: Empty\n", "empty.yaml").unwrap();
        assert!(parsed.run.is_empty());
    }

    #[test]
    fn test_parse_macro_missing_name() {
        let err = parse_macro("ns.X".to_string(), "commands: []\n", "x.yaml").unwrap_err();
        match err {
            CollectError::MalformedMacro { message, .. } => assert!(message.contains("name")),
            other => panic!("Expected malformed macro, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_macro_command_missing_id() {
        let source = "name: X\ncommands:\n  - args: [1]\n";
        assert!(matches!(
            parse_macro("ns.X".to_string(), source, "x.yaml"),
            Err(CollectError::MalformedMacro { .. })
        ));
    }

    #[test]
    fn test_collect_macros_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tools")).unwrap();
        fs::write(dir.path().join("zoom_in.yaml"), "name: Zoom\n").unwrap();
        fs::write(dir.path().join("a_first.yaml"), "name: First\n").unwrap();
        fs::write(dir.path().join("tools/pin_all.yaml"), "name: Pin\n").unwrap();
        fs::write(dir.path().join("notes.yml"), "name: Ignored\n").unwrap();

        let macros = collect_macros(dir.path(), "ns").unwrap();
        let ids: Vec<_> = macros.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["ns.AFirst", "ns.Tools.PinAll", "ns.ZoomIn"]);
    }

    #[test]
    fn test_collect_macros_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("show_slices.yaml"), "name: A\n").unwrap();
        fs::write(dir.path().join("Show_Slices.yaml"), "name: B\n").unwrap();

        let err = collect_macros(dir.path(), "ns").unwrap_err();
        match err {
            BuildError::Collect(CollectError::DuplicateName { name, kind, .. }) => {
                assert_eq!(name, "ns.ShowSlices");
                assert_eq!(kind, "macro");
            }
            other => panic!("Expected duplicate name, got {other:?}"),
        }
    }
}
