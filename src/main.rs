use extension_endpoint::{load_extension, BuildOptions};
use miette::{bail, miette};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: build-extension [--root DIR] [--out DIR] [--check] [--no-protos]";

#[derive(Debug)]
struct Args {
    root: PathBuf,
    out: Option<PathBuf>,
    check: bool,
    compile_protos: bool,
}

// Paths are taken as `OsString` so non-UTF-8 directories are accepted.
fn parse_args(mut args: impl Iterator<Item = OsString>) -> miette::Result<Option<Args>> {
    let mut parsed = Args {
        root: PathBuf::from("."),
        out: None,
        check: false,
        compile_protos: true,
    };
    while let Some(arg) = args.next() {
        match arg.to_str().unwrap_or_default() {
            "--root" => {
                let value = args.next().ok_or_else(|| miette!("--root needs a value\n{USAGE}"))?;
                parsed.root = PathBuf::from(value);
            }
            "--out" => {
                let value = args.next().ok_or_else(|| miette!("--out needs a value\n{USAGE}"))?;
                parsed.out = Some(PathBuf::from(value));
            }
            "--check" => parsed.check = true,
            "--no-protos" => parsed.compile_protos = false,
            "-h" | "--help" => return Ok(None),
            _ => bail!("Unknown argument `{}`\n{USAGE}", arg.to_string_lossy()),
        }
    }
    Ok(Some(parsed))
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| miette!("Failed to initialize logging: {e}"))?;

    let Some(args) = parse_args(std::env::args_os().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let options = BuildOptions {
        compile_protos: args.compile_protos,
        ..BuildOptions::default()
    };
    let out_dir = args.out.unwrap_or_else(|| args.root.join("out"));
    let extension = load_extension(&args.root, &options)?;

    if args.check {
        let stale = extension.check(&out_dir)?;
        if !stale.is_empty() {
            for path in &stale {
                eprintln!("stale: {}", path.display());
            }
            bail!(
                "{} endpoint files in {} are out of date; run build-extension to regenerate them",
                stale.len(),
                out_dir.display()
            );
        }
        println!("Endpoint in {} is up to date", out_dir.display());
        return Ok(());
    }

    let report = extension.write_to(&out_dir)?;
    println!("{report}");
    Ok(())
}
