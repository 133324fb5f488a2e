use crate::error::{BuildError, CollectError};
use crate::utils::list_files;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The `protoc` compiler used to produce descriptor sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protoc {
    program: PathBuf,
}

impl Protoc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Protoc {
            program: program.into(),
        }
    }

    /// Uses `$PROTOC` if set, `protoc` from `PATH` otherwise.
    pub fn from_env() -> Self {
        let program = std::env::var_os("PROTOC").unwrap_or_else(|| OsString::from("protoc"));
        Self::new(program)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Compiles `file` into a serialized `FileDescriptorSet`.
    ///
    /// Returns `Ok(None)` if the compiler executable cannot be found.
    ///
    /// # Errors
    /// Returns `CollectError::Protoc` if the compiler exits unsuccessfully,
    /// and an I/O error for temp file or process failures.
    pub fn compile(&self, proto_path: &Path, file: &Path) -> Result<Option<Vec<u8>>, BuildError> {
        let descriptor = tempfile::Builder::new()
            .suffix(".desc")
            .tempfile()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;

        let mut proto_path_arg = OsString::from("--proto_path=");
        proto_path_arg.push(proto_path);
        let mut descriptor_arg = OsString::from("--descriptor_set_out=");
        descriptor_arg.push(descriptor.path());

        let output = match Command::new(&self.program)
            .arg(proto_path_arg)
            .arg(descriptor_arg)
            .arg(file)
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuildError::io(&self.program, e)),
        };

        if !output.status.success() {
            return Err(CollectError::Protoc {
                file: file.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let bytes = fs::read(descriptor.path()).map_err(|e| BuildError::io(descriptor.path(), e))?;
        Ok(Some(bytes))
    }
}

impl Default for Protoc {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Compiles every `.proto` file directly in `dir` and returns the base64
/// encoded descriptor sets in file name order. Files are skipped with a
/// warning when the compiler is not installed.
///
/// # Errors
/// Returns an error if listing the directory fails or a compilation fails.
pub fn collect_proto_descriptors(dir: &Path, protoc: &Protoc) -> Result<Vec<String>, BuildError> {
    let mut descriptors = Vec::new();
    for relative in list_files(dir, "proto", false)? {
        let file = dir.join(&relative);
        match protoc.compile(dir, &file)? {
            Some(bytes) => {
                log::debug!("Compiled {} ({} bytes)", file.display(), bytes.len());
                descriptors.push(STANDARD.encode(bytes));
            }
            None => log::warn!(
                "{} not found, skipping {}",
                protoc.program().display(),
                relative.display()
            ),
        }
    }
    Ok(descriptors)
}
