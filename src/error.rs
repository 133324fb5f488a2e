use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Collect(#[from] CollectError),

    #[error("I/O error on {}", path.display())]
    #[diagnostic(code(build::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {}", path.display())]
    #[diagnostic(code(build::serialize))]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    #[diagnostic(
        code(config::not_found),
        help("Create a config.yaml at the extension root with `name` and `namespace` keys.")
    )]
    NotFound { path: PathBuf },

    #[error("Malformed configuration: {message}")]
    #[diagnostic(
        code(config::malformed),
        help("config.yaml must be a mapping with string `name` and `namespace` keys.")
    )]
    Malformed {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("Extension name is empty")]
    #[diagnostic(
        code(config::empty_name),
        help("Set `name` in config.yaml to the name shown in the UI.")
    )]
    EmptyName,

    #[error("Invalid namespace `{namespace}`: {reason}")]
    #[diagnostic(
        code(config::invalid_namespace),
        help("A namespace is a dot-separated list of identifiers, e.g. `com.example.myext`.")
    )]
    InvalidNamespace { namespace: String, reason: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum NamingError {
    #[error("Path `{path}` has an empty component")]
    #[diagnostic(
        code(naming::empty_component),
        help("Every directory and file name must produce a non-empty name segment.")
    )]
    EmptyComponent { path: String },

    #[error("Component `{component}` of path `{path}` contains a dot")]
    #[diagnostic(
        code(naming::dotted_component),
        help("Dots separate name segments; use directories instead of dots in file names.")
    )]
    DottedComponent { path: String, component: String },

    #[error("Path `{path}` is not valid UTF-8")]
    #[diagnostic(code(naming::not_utf8))]
    NotUtf8 { path: String },

    #[error("Path `{path}` is not a plain relative path")]
    #[diagnostic(
        code(naming::not_relative),
        help("Names are derived from paths relative to the module's source directory.")
    )]
    NotRelative { path: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum CollectError {
    #[error("Source directory not found: {}", path.display())]
    #[diagnostic(
        code(collect::missing_source_dir),
        help("Modules live in subdirectories of `src/` under the extension root.")
    )]
    MissingSourceDir { path: PathBuf },

    #[error("Duplicate {kind} name `{name}` from `{}` and `{}`", first.display(), second.display())]
    #[diagnostic(
        code(collect::duplicate_name),
        help("Both files resolve to the same name; rename one of them.")
    )]
    DuplicateName {
        kind: &'static str,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Malformed macro file: {message}")]
    #[diagnostic(
        code(collect::malformed_macro),
        help("A macro file needs a `name` and an optional `commands` list of entries with `id` and `args`.")
    )]
    MalformedMacro {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("protoc failed on {} ({status}): {stderr}", file.display())]
    #[diagnostic(
        code(collect::protoc_failed),
        help("Check the proto file compiles with `protoc` on its own, or pass --no-protos.")
    )]
    Protoc {
        file: PathBuf,
        status: String,
        stderr: String,
    },
}
