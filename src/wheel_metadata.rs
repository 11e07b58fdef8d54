// src/wheel_metadata.rs
//
// Builds the metadata record that ships inside a wheel: which CUDA version it
// targets and, for every bundled library, the version and the files to fetch
// for the target system.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Library {
    Cudnn,
    Cutensor,
    Nccl,
}

impl Library {
    pub fn as_str(&self) -> &'static str {
        match self {
            Library::Cudnn => "cudnn",
            Library::Cutensor => "cutensor",
            Library::Nccl => "nccl",
        }
    }
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum WheelMetadataError {
    UnsupportedCombination { library: Library, cuda: String },
    MissingTarget { library: Library, target: String },
    MissingVersion(Library),
    Installer(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for WheelMetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WheelMetadataError::UnsupportedCombination { library, cuda } => write!(
                f,
                "Specified library/CUDA combination not supported: {} for CUDA {}",
                library, cuda
            ),
            WheelMetadataError::MissingTarget { library, target } => {
                write!(f, "No {} assets for target system '{}'", library, target)
            }
            WheelMetadataError::MissingVersion(library) => {
                write!(f, "Record for {} does not carry a '{}' version", library, library)
            }
            WheelMetadataError::Installer(s) => write!(f, "Installer error: {}", s),
            WheelMetadataError::Io(e) => write!(f, "IO error: {}", e),
            WheelMetadataError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for WheelMetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WheelMetadataError::Io(e) => Some(e),
            WheelMetadataError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WheelMetadataError {
    fn from(err: std::io::Error) -> Self {
        WheelMetadataError::Io(err)
    }
}

impl From<serde_json::Error> for WheelMetadataError {
    fn from(err: serde_json::Error) -> Self {
        WheelMetadataError::Json(err)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetAssets {
    #[serde(default)]
    pub filenames: Vec<String>,
}

/// One entry of the installer's dump for a library.
///
/// The library version sits under a key named after the library
/// (`{"cuda": "12.x", "nccl": "2.16.5", "assets": {...}}`), so it is kept in
/// `extra` and read back through [`LibraryRecord::version`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LibraryRecord {
    pub cuda: String,
    #[serde(default)]
    pub assets: BTreeMap<String, TargetAssets>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LibraryRecord {
    pub fn version(&self, library: Library) -> Option<&str> {
        self.extra.get(library.as_str()).and_then(Value::as_str)
    }
}

/// Where library records come from.
pub trait RecordSource {
    fn records(&self, library: Library, cuda: &str) -> Result<Vec<LibraryRecord>, WheelMetadataError>;
}

/// Runs `<interpreter> <script> --library L --cuda C --action dump` inside
/// `dir` and parses the JSON list it prints.
#[derive(Debug, Clone)]
pub struct InstallerScript {
    interpreter: String,
    script: String,
    dir: PathBuf,
}

impl InstallerScript {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: "install_library.py".to_string(),
            dir: dir.into(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.script = script.to_string();
        self
    }
}

impl RecordSource for InstallerScript {
    fn records(&self, library: Library, cuda: &str) -> Result<Vec<LibraryRecord>, WheelMetadataError> {
        log::debug!(
            "running {} {} --library {} --cuda {} --action dump in {}",
            self.interpreter,
            self.script,
            library,
            cuda,
            self.dir.display()
        );
        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .args(["--library", library.as_str(), "--cuda", cuda, "--action", "dump"])
            .current_dir(&self.dir)
            .output()?;
        if !output.status.success() {
            return Err(WheelMetadataError::Installer(format!(
                "{} exited with {}: {}",
                self.script,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Records for several libraries held in memory, typically loaded from a
/// JSON file shaped `{"cudnn": [record, ...], "nccl": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RecordFile {
    records: BTreeMap<String, Vec<LibraryRecord>>,
}

impl RecordFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WheelMetadataError> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, WheelMetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RecordSource for RecordFile {
    fn records(&self, library: Library, _cuda: &str) -> Result<Vec<LibraryRecord>, WheelMetadataError> {
        Ok(self.records.get(library.as_str()).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryMetadata {
    pub version: String,
    pub filenames: Vec<String>,
}

/// Serialises as `{"cuda": ..., "packaging": "pip", "<library>": {...}, ...}`
/// with libraries in the order they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelMetadata {
    pub cuda: String,
    pub packaging: String,
    pub libraries: Vec<(Library, LibraryMetadata)>,
}

impl Serialize for WheelMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.libraries.len()))?;
        map.serialize_entry("cuda", &self.cuda)?;
        map.serialize_entry("packaging", &self.packaging)?;
        for (library, metadata) in &self.libraries {
            map.serialize_entry(library.as_str(), metadata)?;
        }
        map.end()
    }
}

impl WheelMetadata {
    pub fn get(&self, library: Library) -> Option<&LibraryMetadata> {
        self.libraries
            .iter()
            .find(|(l, _)| *l == library)
            .map(|(_, metadata)| metadata)
    }

    /// JSON with four-space indentation.
    pub fn to_json_string(&self) -> Result<String, WheelMetadataError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| WheelMetadataError::Installer(format!("non UTF-8 output: {}", e)))
    }
}

/// Name of the host system as wheel assets are keyed (`Linux`, `Windows`,
/// `Darwin`).
pub fn host_system() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "windows" => "Windows".to_string(),
        "macos" => "Darwin".to_string(),
        other => other.to_string(),
    }
}

/// Directory of the running executable, where `install_library.py` is looked
/// up by default. Falls back to the working directory.
pub fn default_installer_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Picks, for every library, the first record built for `cuda` and its
/// assets for `target`.
pub fn generate(
    cuda: &str,
    target: &str,
    libraries: &[Library],
    source: &dyn RecordSource,
) -> Result<WheelMetadata, WheelMetadataError> {
    let mut metadata = WheelMetadata {
        cuda: cuda.to_string(),
        packaging: "pip".to_string(),
        libraries: Vec::new(),
    };

    for &library in libraries {
        if metadata.get(library).is_some() {
            continue;
        }
        let records = source.records(library, cuda)?;
        let record = records
            .iter()
            .find(|record| record.cuda == cuda)
            .ok_or_else(|| WheelMetadataError::UnsupportedCombination {
                library,
                cuda: cuda.to_string(),
            })?;
        let version = record
            .version(library)
            .ok_or(WheelMetadataError::MissingVersion(library))?;
        let assets = record
            .assets
            .get(target)
            .ok_or_else(|| WheelMetadataError::MissingTarget {
                library,
                target: target.to_string(),
            })?;
        log::info!("{} {} for CUDA {} ({})", library, version, cuda, target);
        metadata.libraries.push((
            library,
            LibraryMetadata {
                version: version.to_string(),
                filenames: assets.filenames.clone(),
            },
        ));
    }

    Ok(metadata)
}
