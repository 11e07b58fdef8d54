use std::io::Write;
use std::process::Command;
use std::str;
use tempfile::NamedTempFile;

fn get_cli_path() -> &'static str {
    env!("CARGO_BIN_EXE_wheel_metadata")
}

fn records_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create records file");
    write!(
        file,
        r#"{{
            "cudnn": [
                {{"cuda": "11.x", "cudnn": "8.8.1", "assets": {{"Linux": {{"filenames": ["libcudnn.so.8"]}}}}}}
            ],
            "cutensor": [
                {{"cuda": "11.x", "cutensor": "1.7.0",
                  "assets": {{"Linux": {{"filenames": ["libcutensor.so.1"]}},
                              "Windows": {{"filenames": ["cutensor.dll"]}}}}}}
            ]
        }}"#
    )
    .expect("Failed to write records file");
    file
}

#[test]
fn test_cli_help_message() {
    let output = Command::new(get_cli_path())
        .arg("--help")
        .output()
        .expect("Failed to execute --help command");

    assert!(output.status.success(), "CLI --help exited with error: {:?}", output);
    let stdout = str::from_utf8(&output.stdout).expect("stdout is not valid UTF-8");
    assert!(stdout.contains("Usage:"), "Help message should contain 'Usage:'");
    assert!(stdout.contains("--cuda"), "Help message should mention --cuda");
    assert!(stdout.contains("--library"), "Help message should mention --library");
    assert!(
        stdout.contains("directory of this executable"),
        "Help message should document the installer directory default"
    );
}

#[test]
fn test_cli_prints_metadata_json() {
    let records = records_file();
    let output = Command::new(get_cli_path())
        .args(["--cuda", "11.x", "--target", "Windows", "--library", "cutensor"])
        .arg("--records")
        .arg(records.path())
        .output()
        .expect("Failed to execute metadata generation");

    assert!(output.status.success(), "CLI exited with error: {:?}", output);
    let stdout = str::from_utf8(&output.stdout).expect("stdout is not valid UTF-8");
    let value: serde_json::Value = serde_json::from_str(stdout).expect("stdout is not JSON");
    assert_eq!(
        value,
        serde_json::json!({
            "cuda": "11.x",
            "packaging": "pip",
            "cutensor": {"version": "1.7.0", "filenames": ["cutensor.dll"]}
        })
    );
    assert!(stdout.starts_with("{\n    \"cuda\""), "Output should use 4-space indentation: {}", stdout);
}

#[test]
fn test_cli_repeated_library_flag() {
    let records = records_file();
    let output = Command::new(get_cli_path())
        .args(["--cuda", "11.x", "--target", "Linux"])
        .args(["--library", "cudnn", "--library", "cutensor"])
        .arg("--records")
        .arg(records.path())
        .output()
        .expect("Failed to execute metadata generation");

    assert!(output.status.success(), "CLI exited with error: {:?}", output);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    assert_eq!(value["cudnn"]["version"], "8.8.1");
    assert_eq!(value["cutensor"]["filenames"][0], "libcutensor.so.1");
}

#[test]
fn test_cli_unsupported_cuda_version_fails() {
    let records = records_file();
    let output = Command::new(get_cli_path())
        .args(["--cuda", "12.x", "--target", "Linux", "--library", "cudnn"])
        .arg("--records")
        .arg(records.path())
        .output()
        .expect("Failed to execute metadata generation");

    assert!(!output.status.success(), "CLI should fail for an unknown CUDA version. Output: {:?}", output);
    let stderr = str::from_utf8(&output.stderr).expect("stderr is not valid UTF-8");
    assert!(
        stderr.contains("Specified library/CUDA combination not supported"),
        "Stderr should describe the unsupported combination. Stderr: {}",
        stderr
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_rejects_unknown_library() {
    let output = Command::new(get_cli_path())
        .args(["--cuda", "11.x", "--library", "cublas"])
        .output()
        .expect("Failed to execute command with invalid --library");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).expect("stderr is not valid UTF-8");
    assert!(
        stderr.contains("invalid value 'cublas' for '--library <LIBRARY>'"),
        "Stderr should reject the library name. Stderr: {}",
        stderr
    );
}

#[test]
fn test_cli_missing_required_args() {
    let output = Command::new(get_cli_path())
        .args(["--library", "nccl"])
        .output()
        .expect("Failed to execute command with missing --cuda");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).expect("stderr is not valid UTF-8");
    assert!(
        stderr.contains("the following required arguments were not provided"),
        "Stderr should indicate missing arguments. Stderr: {}",
        stderr
    );
    assert!(stderr.contains("--cuda <CUDA>"), "Stderr should mention --cuda. Stderr: {}", stderr);
}
