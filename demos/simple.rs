use extension_endpoint::{load_extension, BuildOptions};
use std::path::Path;

fn main() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/basic_extension");
    let options = BuildOptions {
        compile_protos: false,
        ..BuildOptions::default()
    };

    match load_extension(&root, &options) {
        Ok(extension) => {
            for file in extension.files().unwrap() {
                println!("== {} ==\n{}", file.path.display(), file.contents);
            }
        }
        Err(e) => {
            eprintln!("Failed to load extension: {:?}", miette::Report::new(e));
        }
    }
}
