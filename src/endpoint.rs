use crate::macros::Macro;
use crate::sql::SqlModule;
use serde::Serialize;

/// Features advertised by every manifest, in this order.
pub const FEATURES: [&str; 3] = ["macros", "sql_modules", "proto_descriptors"];

/// File names written into each `modules/{module}/` directory.
pub const GENERATED_FILES: [&str; 3] = ["sql_modules", "macros", "proto_descriptors"];

pub const MANIFEST_FILE: &str = "manifest";
pub const MODULES_DIR: &str = "modules";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub features: [&'static str; 3],
    pub modules: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SqlModulesDocument<'a> {
    pub sql_modules: &'a [SqlModule],
}

#[derive(Debug, Serialize)]
pub(crate) struct MacrosDocument<'a> {
    pub macros: &'a [Macro],
}

#[derive(Debug, Serialize)]
pub(crate) struct ProtoDescriptorsDocument<'a> {
    pub proto_descriptors: &'a [String],
}

/// Serializes `value` the way endpoint files are written: two-space
/// indentation, UTF-8 kept as is, one trailing newline.
///
/// # Errors
/// Returns a `serde_json::Error` if serialization fails.
pub fn to_endpoint_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_layout() {
        let manifest = Manifest {
            name: "Ext",
            namespace: "com.example",
            features: FEATURES,
            modules: vec!["a", "b"],
        };
        let expected = r#"{
  "name": "Ext",
  "namespace": "com.example",
  "features": [
    "macros",
    "sql_modules",
    "proto_descriptors"
  ],
  "modules": [
    "a",
    "b"
  ]
}
"#;
        assert_eq!(to_endpoint_json(&manifest).unwrap(), expected);
    }

    #[test]
    fn test_empty_lists_and_unicode() {
        let document = SqlModulesDocument { sql_modules: &[] };
        assert_eq!(to_endpoint_json(&document).unwrap(), "{\n  \"sql_modules\": []\n}\n");

        let modules = [SqlModule {
            name: "ns.é".to_string(),
            sql: "SELECT 'ü';".to_string(),
        }];
        let text = to_endpoint_json(&SqlModulesDocument { sql_modules: &modules }).unwrap();
        assert!(text.contains("ns.é"));
        assert!(text.contains("SELECT 'ü';"));
        assert!(text.ends_with("}\n"));
        assert!(!text.ends_with("\n\n"));
    }
}
