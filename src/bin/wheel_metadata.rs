//! Generates the metadata embedded in a wheel. Not intended for end users.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use arraykit::wheel_metadata::{self, InstallerScript, Library, RecordFile, RecordSource};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// CUDA version
    #[clap(long, value_parser)]
    cuda: String,
    /// Target system (default: host platform name)
    #[clap(long, value_parser)]
    target: Option<String>,
    #[clap(long, value_enum, required = true)]
    library: Vec<Library>,
    /// Read library records from this JSON file instead of running the installer
    #[clap(long, value_parser)]
    records: Option<PathBuf>,
    /// Directory containing install_library.py (default: directory of this executable)
    #[clap(long, value_parser)]
    installer_dir: Option<PathBuf>,
    /// Interpreter used to run the installer script
    #[clap(long, value_parser, default_value = "python3")]
    python: String,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    let target = args.target.unwrap_or_else(wheel_metadata::host_system);

    let source: Box<dyn RecordSource> = match &args.records {
        Some(path) => Box::new(RecordFile::load(path)?),
        None => {
            let dir = args.installer_dir.unwrap_or_else(wheel_metadata::default_installer_dir);
            log::debug!("running the installer from {}", dir.display());
            Box::new(InstallerScript::new(dir).with_interpreter(&args.python))
        }
    };

    let metadata = wheel_metadata::generate(&args.cuda, &target, &args.library, source.as_ref())?;
    println!("{}", metadata.to_json_string()?);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Application error: {}", e);
        let mut current_err: Option<&(dyn Error + 'static)> = e.source();
        while let Some(source) = current_err {
            eprintln!("Caused by: {}", source);
            current_err = source.source();
        }
        std::process::exit(1);
    }
}
