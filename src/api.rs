use crate::config::ExtensionConfig;
use crate::endpoint::{
    to_endpoint_json, MacrosDocument, Manifest, ProtoDescriptorsDocument, SqlModulesDocument,
    FEATURES, GENERATED_FILES, MANIFEST_FILE, MODULES_DIR,
};
use crate::error::{BuildError, CollectError, NamingError};
use crate::macros::{collect_macros, Macro};
use crate::proto::{collect_proto_descriptors, Protoc};
use crate::sql::{collect_sql_modules, SqlModule};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const SOURCE_DIR: &str = "src";
pub const SQL_MODULES_DIR: &str = "sql_modules";
pub const MACROS_DIR: &str = "macros";
pub const PROTOS_DIR: &str = "protos";

/// Options controlling how an extension is collected.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Compile `.proto` files. When false, every module has no descriptors.
    pub compile_protos: bool,
    pub protoc: Protoc,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            compile_protos: true,
            protoc: Protoc::default(),
        }
    }
}

/// Everything served for a single module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEndpoint {
    pub name: String,
    pub sql_modules: Vec<SqlModule>,
    pub macros: Vec<Macro>,
    pub proto_descriptors: Vec<String>,
}

/// A generated file, with its path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A fully collected extension, ready to be rendered or written.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub config: ExtensionConfig,
    pub modules: Vec<ModuleEndpoint>,
}

/// Summary of a write to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub modules: Vec<String>,
    pub files_written: usize,
    pub sql_modules: usize,
    pub macros: usize,
    pub proto_descriptors: usize,
    pub pruned: Vec<String>,
}

impl Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Built {} modules: {}",
            self.modules.len(),
            self.modules.join(", ")
        )
    }
}

impl Extension {
    #[must_use]
    pub fn manifest(&self) -> Manifest<'_> {
        Manifest {
            name: &self.config.name,
            namespace: &self.config.namespace,
            features: FEATURES,
            modules: self.modules.iter().map(|m| m.name.as_str()).collect(),
        }
    }

    /// Renders every endpoint file: the manifest followed by the three files
    /// of each module.
    ///
    /// # Errors
    /// Returns `BuildError::Serialize` if a document fails to serialize.
    pub fn files(&self) -> Result<Vec<EndpointFile>, BuildError> {
        let mut files = Vec::with_capacity(1 + self.modules.len() * GENERATED_FILES.len());
        files.push(render(PathBuf::from(MANIFEST_FILE), &self.manifest())?);

        for module in &self.modules {
            let dir = Path::new(MODULES_DIR).join(&module.name);
            files.push(render(
                dir.join(SQL_MODULES_DIR),
                &SqlModulesDocument {
                    sql_modules: &module.sql_modules,
                },
            )?);
            files.push(render(
                dir.join(MACROS_DIR),
                &MacrosDocument {
                    macros: &module.macros,
                },
            )?);
            files.push(render(
                dir.join("proto_descriptors"),
                &ProtoDescriptorsDocument {
                    proto_descriptors: &module.proto_descriptors,
                },
            )?);
        }
        Ok(files)
    }

    /// Writes the endpoint into `out_dir` and prunes the generated files of
    /// modules that no longer exist.
    ///
    /// # Errors
    /// Returns an error if rendering or any filesystem operation fails.
    pub fn write_to(&self, out_dir: &Path) -> Result<BuildReport, BuildError> {
        let files = self.files()?;
        for file in &files {
            write_atomic(&out_dir.join(&file.path), &file.contents)?;
        }

        let pruned = self.prune_stale_modules(out_dir)?;
        let report = BuildReport {
            modules: self.modules.iter().map(|m| m.name.clone()).collect(),
            files_written: files.len(),
            sql_modules: self.modules.iter().map(|m| m.sql_modules.len()).sum(),
            macros: self.modules.iter().map(|m| m.macros.len()).sum(),
            proto_descriptors: self.modules.iter().map(|m| m.proto_descriptors.len()).sum(),
            pruned,
        };
        log::info!(
            "Wrote {} files to {} ({} SQL modules, {} macros, {} proto descriptors)",
            report.files_written,
            out_dir.display(),
            report.sql_modules,
            report.macros,
            report.proto_descriptors
        );
        Ok(report)
    }

    /// Compares the rendered endpoint with the contents of `out_dir` and
    /// returns the relative paths that are missing, differ, or belong to a
    /// module that no longer exists. Nothing is written.
    ///
    /// # Errors
    /// Returns an error if rendering fails or an existing file cannot be read.
    pub fn check(&self, out_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        let mut stale = Vec::new();
        for file in self.files()? {
            let path = out_dir.join(&file.path);
            match fs::read_to_string(&path) {
                Ok(existing) if existing == file.contents => {}
                Ok(_) => stale.push(file.path),
                Err(e) if e.kind() == ErrorKind::NotFound => stale.push(file.path),
                Err(e) => return Err(BuildError::io(path, e)),
            }
        }

        for module in self.stale_module_dirs(out_dir)? {
            for generated in GENERATED_FILES {
                let relative = Path::new(MODULES_DIR).join(&module).join(generated);
                if out_dir.join(&relative).is_file() {
                    stale.push(relative);
                }
            }
        }
        Ok(stale)
    }

    fn stale_module_dirs(&self, out_dir: &Path) -> Result<Vec<String>, BuildError> {
        let modules_dir = out_dir.join(MODULES_DIR);
        if !modules_dir.is_dir() {
            return Ok(Vec::new());
        }
        let current: BTreeSet<&str> = self.modules.iter().map(|m| m.name.as_str()).collect();
        let mut stale = Vec::new();
        for entry in fs::read_dir(&modules_dir).map_err(|e| BuildError::io(&modules_dir, e))? {
            let entry = entry.map_err(|e| BuildError::io(&modules_dir, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !current.contains(name.as_str()) {
                stale.push(name);
            }
        }
        stale.sort();
        Ok(stale)
    }

    fn prune_stale_modules(&self, out_dir: &Path) -> Result<Vec<String>, BuildError> {
        let stale = self.stale_module_dirs(out_dir)?;
        for module in &stale {
            let dir = out_dir.join(MODULES_DIR).join(module);
            for generated in GENERATED_FILES {
                let path = dir.join(generated);
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(BuildError::io(path, e)),
                }
            }
            let is_empty = fs::read_dir(&dir)
                .map_err(|e| BuildError::io(&dir, e))?
                .next()
                .is_none();
            if is_empty {
                fs::remove_dir(&dir).map_err(|e| BuildError::io(&dir, e))?;
            }
            log::warn!("Pruned generated files of removed module `{module}`");
        }
        Ok(stale)
    }
}

fn render<T: Serialize>(path: PathBuf, document: &T) -> Result<EndpointFile, BuildError> {
    match to_endpoint_json(document) {
        Ok(contents) => Ok(EndpointFile { path, contents }),
        Err(source) => Err(BuildError::Serialize { path, source }),
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), BuildError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| BuildError::io(tmp.path(), e))?;
    // Temp files start as 0600; endpoint files must be world-readable.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| BuildError::io(tmp.path(), e))?;
    }
    tmp.persist(path)
        .map_err(|e| BuildError::io(path, e.error))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Returns the sorted names of the module directories under `root/src`.
///
/// # Errors
/// Returns `CollectError::MissingSourceDir` if `root/src` does not exist, and
/// `NamingError::NotUtf8` for a module directory whose name is not UTF-8.
pub fn discover_modules(root: &Path) -> Result<Vec<String>, BuildError> {
    let source_dir = root.join(SOURCE_DIR);
    if !source_dir.is_dir() {
        return Err(CollectError::MissingSourceDir { path: source_dir }.into());
    }

    let mut modules = Vec::new();
    for entry in fs::read_dir(&source_dir).map_err(|e| BuildError::io(&source_dir, e))? {
        let entry = entry.map_err(|e| BuildError::io(&source_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().into_string().map_err(|name| NamingError::NotUtf8 {
            path: name.to_string_lossy().into_owned(),
        })?;
        if !name.starts_with('.') {
            modules.push(name);
        }
    }
    modules.sort();
    Ok(modules)
}

/// Collects the SQL modules, macros and proto descriptors of one module.
///
/// # Errors
/// Propagates any collection error for the module's files.
pub fn collect_module(
    root: &Path,
    module: &str,
    config: &ExtensionConfig,
    options: &BuildOptions,
) -> Result<ModuleEndpoint, BuildError> {
    let module_dir = root.join(SOURCE_DIR).join(module);
    let sql_modules = collect_sql_modules(&module_dir.join(SQL_MODULES_DIR), &config.namespace)?;
    let macros = collect_macros(&module_dir.join(MACROS_DIR), &config.namespace)?;
    let proto_descriptors = if options.compile_protos {
        collect_proto_descriptors(&module_dir.join(PROTOS_DIR), &options.protoc)?
    } else {
        Vec::new()
    };

    log::info!(
        "Module `{module}`: {} SQL modules, {} macros, {} proto descriptors",
        sql_modules.len(),
        macros.len(),
        proto_descriptors.len()
    );
    Ok(ModuleEndpoint {
        name: module.to_string(),
        sql_modules,
        macros,
        proto_descriptors,
    })
}

/// Loads `config.yaml` and collects every module under `root/src` into memory.
///
/// This is the primary entry point for reading an extension. Nothing is
/// written; use [`Extension::write_to`] or [`Extension::check`] afterwards.
///
/// # Errors
/// Returns a `BuildError` if the configuration is invalid or any module fails
/// to collect.
pub fn load_extension(root: &Path, options: &BuildOptions) -> Result<Extension, BuildError> {
    let config = ExtensionConfig::load(root)?;
    let modules = discover_modules(root)?
        .iter()
        .map(|module| collect_module(root, module, &config, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Extension { config, modules })
}

/// Loads the extension at `root` and writes its endpoint into `out_dir`.
///
/// # Errors
/// Returns a `BuildError` if loading or writing fails.
pub fn build(root: &Path, out_dir: &Path, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let extension = load_extension(root, options)?;
    let report = extension.write_to(out_dir)?;
    log::info!("{report}");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension() -> Extension {
        Extension {
            config: ExtensionConfig {
                name: "Test".to_string(),
                namespace: "com.test".to_string(),
            },
            modules: vec![ModuleEndpoint {
                name: "core".to_string(),
                sql_modules: vec![SqlModule {
                    name: "com.test.helpers".to_string(),
                    sql: "SELECT 1;".to_string(),
                }],
                macros: Vec::new(),
                proto_descriptors: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_files_layout() {
        let files = extension().files().unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("manifest"),
                PathBuf::from("modules/core/sql_modules"),
                PathBuf::from("modules/core/macros"),
                PathBuf::from("modules/core/proto_descriptors"),
            ]
        );
        assert_eq!(files[2].contents, "{\n  \"macros\": []\n}\n");
    }

    #[test]
    fn test_report_display() {
        let report = BuildReport {
            modules: vec!["core".to_string(), "extra".to_string()],
            ..BuildReport::default()
        };
        assert_eq!(report.to_string(), "Built 2 modules: core, extra");
    }

    #[test]
    fn test_write_then_check_is_clean() {
        let out = tempfile::tempdir().unwrap();
        let ext = extension();
        let report = ext.write_to(out.path()).unwrap();
        assert_eq!(report.files_written, 4);
        assert_eq!(report.sql_modules, 1);
        assert!(ext.check(out.path()).unwrap().is_empty());
    }

    #[test]
    fn test_prune_keeps_foreign_files() {
        let out = tempfile::tempdir().unwrap();
        let gone = out.path().join("modules/gone");
        fs::create_dir_all(&gone).unwrap();
        fs::write(gone.join("sql_modules"), "{}").unwrap();
        fs::write(gone.join("notes.txt"), "keep me").unwrap();
        let also_gone = out.path().join("modules/also_gone");
        fs::create_dir_all(&also_gone).unwrap();
        fs::write(also_gone.join("macros"), "{}").unwrap();

        let report = extension().write_to(out.path()).unwrap();
        assert_eq!(report.pruned, vec!["also_gone".to_string(), "gone".to_string()]);
        assert!(!gone.join("sql_modules").exists());
        assert!(gone.join("notes.txt").exists());
        assert!(!also_gone.exists());
    }
}
