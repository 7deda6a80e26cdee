//! End-to-end tests for the `encprops` binary

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PASSWORD: &str = "s3cr3t-passw0rd";
const URL: &str = "jdbc:postgresql://db.internal/app";
const URL_TRIPLE_DES: &str = "AQIDBAUGBwjV59ZzoIxrFTBjqhhH5m4b01R5EfFUsf1G64UkaSGGq/PxM1IcigtJ";
const URL_DES: &str = "AQIDBAUGBwjcVi98OlXbRH+7T3rCyMLB+8AEjF69zAuAvYQjZLkcBvqJwBLlzOJq";

fn encprops() -> Command {
	let mut cmd = Command::cargo_bin("encprops").unwrap();
	cmd.env_remove("ENCPROPS_PASSWORD")
		.env_remove("RUST_LOG")
		.env("NO_COLOR", "1");
	cmd
}

fn fixtures() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures")
}

/// Writes an initializer configuration pointing at the shared fixtures
#[fixture]
fn config_file() -> (TempDir, PathBuf) {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("encprops.toml");
	fs::write(
		&path,
		format!(
			"password_env_name = \"ENCPROPS_CLI_TEST_PASSWORD\"\nresource_roots = [{:?}]\noverrides_directory = {:?}\n",
			fixtures().join("classpath").display().to_string(),
			fixtures().join("overrides").display().to_string(),
		),
	)
	.unwrap();
	(dir, path)
}

#[rstest]
fn test_algorithms_lists_supported_algorithms() {
	encprops()
		.arg("algorithms")
		.assert()
		.success()
		.stdout(predicate::str::contains("PBEWithMD5AndDES"))
		.stdout(predicate::str::contains("PBEWithMD5AndTripleDES (default)"));
}

#[rstest]
#[case(format!("ENC({})", URL_TRIPLE_DES), "PBEWithMD5AndTripleDES")]
#[case(URL_TRIPLE_DES.to_string(), "pbewithmd5andtripledes")]
#[case(format!("  ENC({})  ", URL_DES), "PBEWithMD5AndDES")]
fn test_decrypt_known_values(#[case] value: String, #[case] algorithm: &str) {
	encprops()
		.env("ENCPROPS_PASSWORD", PASSWORD)
		.args(["decrypt", value.as_str(), "--algorithm", algorithm])
		.assert()
		.success()
		.stdout(format!("{}\n", URL));
}

#[rstest]
fn test_encrypt_then_decrypt_roundtrip() {
	// Arrange
	let output = encprops()
		.env("ENCPROPS_PASSWORD", PASSWORD)
		.args(["encrypt", "hunter2"])
		.output()
		.unwrap();
	assert!(output.status.success());
	let encrypted = String::from_utf8(output.stdout).unwrap();

	// Act & Assert
	assert!(encrypted.starts_with("ENC("));
	encprops()
		.env("ENCPROPS_PASSWORD", PASSWORD)
		.args(["decrypt", encrypted.trim()])
		.assert()
		.success()
		.stdout("hunter2\n");
}

#[rstest]
fn test_encrypt_reads_stdin_and_custom_env() {
	// Arrange
	let output = encprops()
		.env("APP_KEY", PASSWORD)
		.args(["encrypt", "--raw", "--password-env", "APP_KEY"])
		.write_stdin("from stdin\n")
		.output()
		.unwrap();
	assert!(output.status.success());
	let encrypted = String::from_utf8(output.stdout).unwrap();

	// Act & Assert
	assert!(!encrypted.starts_with("ENC("));
	encprops()
		.env("APP_KEY", PASSWORD)
		.args(["decrypt", "--password-env", "APP_KEY"])
		.write_stdin(encrypted)
		.assert()
		.success()
		.stdout("from stdin\n");
}

#[rstest]
fn test_password_argument_warns() {
	encprops()
		.args(["decrypt", URL_TRIPLE_DES, "--password", PASSWORD])
		.assert()
		.success()
		.stdout(format!("{}\n", URL))
		.stderr(predicate::str::contains("process list"));
}

#[rstest]
fn test_wrong_password_fails() {
	encprops()
		.env("ENCPROPS_PASSWORD", "wrong-password")
		.args(["decrypt", URL_TRIPLE_DES])
		.assert()
		.failure()
		.code(1)
		.stderr(predicate::str::contains("Decryption failed"))
		.stderr(predicate::str::contains("wrong-password").not());
}

#[rstest]
fn test_missing_password_fails_without_terminal() {
	encprops()
		.args(["decrypt", URL_TRIPLE_DES])
		.assert()
		.failure()
		.stderr(predicate::str::contains("ENCPROPS_PASSWORD"));
}

#[rstest]
fn test_unknown_algorithm_is_rejected() {
	encprops()
		.env("ENCPROPS_PASSWORD", PASSWORD)
		.args(["encrypt", "value", "--algorithm", "ROT13"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("ROT13"));
}

#[rstest]
fn test_show_redacts_sensitive_values(config_file: (TempDir, PathBuf)) {
	// Arrange
	let (_dir, path) = config_file;

	// Act
	let output = encprops()
		.env("ENCPROPS_CLI_TEST_PASSWORD", PASSWORD)
		.args(["show", "--format", "json", "--config"])
		.arg(&path)
		.output()
		.unwrap();

	// Assert
	assert!(output.status.success());
	let properties: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
	let find = |name: &str| {
		properties
			.as_array()
			.unwrap()
			.iter()
			.find(|p| p["name"] == name)
			.cloned()
			.unwrap()
	};
	assert_eq!(find("db.password")["value"], "[REDACTED]");
	assert_eq!(find("db.url")["value"], URL);
	assert_eq!(find("server.port")["value"], "9090");
	assert_eq!(find("server.port")["source"], "applicationOverride");
}

#[rstest]
fn test_show_reveals_single_property(config_file: (TempDir, PathBuf)) {
	// Arrange
	let (_dir, path) = config_file;

	// Act & Assert
	encprops()
		.env("ENCPROPS_CLI_TEST_PASSWORD", PASSWORD)
		.args(["show", "--reveal", "--key", "db.password", "--config"])
		.arg(&path)
		.assert()
		.success()
		.stdout("hunter2\n");
}

#[rstest]
fn test_show_properties_format(config_file: (TempDir, PathBuf)) {
	// Arrange
	let (_dir, path) = config_file;

	// Act & Assert
	encprops()
		.env("ENCPROPS_CLI_TEST_PASSWORD", PASSWORD)
		.args(["show", "--format", "properties", "--config"])
		.arg(&path)
		.assert()
		.success()
		.stdout(predicate::str::contains("server.port=9090"))
		.stdout(predicate::str::contains("db.password=[REDACTED]"));
}

#[rstest]
fn test_show_missing_config_fails() {
	encprops()
		.env("ENCPROPS_CLI_TEST_PASSWORD", PASSWORD)
		.args(["show", "--config", "/nonexistent/encprops.toml"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("encprops.toml"));
}

#[rstest]
fn test_show_plain_properties_without_password() {
	// Arrange
	let dir = TempDir::new().unwrap();
	fs::create_dir(dir.path().join("resources")).unwrap();
	fs::write(dir.path().join("resources/application.properties"), "a=1\n").unwrap();
	let path = dir.path().join("encprops.toml");
	fs::write(
		&path,
		"password_env_name = \"ENCPROPS_CLI_UNSET_PASSWORD\"\nresource_roots = [\"resources\"]\n",
	)
	.unwrap();

	// Act & Assert
	encprops()
		.env_remove("ENCPROPS_CLI_UNSET_PASSWORD")
		.args(["show", "--key", "a", "--config"])
		.arg(&path)
		.assert()
		.success()
		.stdout("1\n");
}

#[rstest]
fn test_show_reports_missing_password_when_encrypted_value_is_read(
	config_file: (TempDir, PathBuf),
) {
	// Arrange
	let (_dir, path) = config_file;

	// Act & Assert
	encprops()
		.env_remove("ENCPROPS_CLI_TEST_PASSWORD")
		.args(["show", "--key", "db.url", "--config"])
		.arg(&path)
		.assert()
		.failure()
		.code(1)
		.stderr(predicate::str::contains("ENCPROPS_CLI_TEST_PASSWORD"));
}
