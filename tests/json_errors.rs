use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cmate(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cmate").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("XDG_DATA_HOME", temp.path().join(".local"));
    cmd
}

#[test]
fn unsupported_provider_has_stable_code() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.args(["ask", "--provider", "nope", "--json", "hi"]);
    cmd.assert()
        .failure()
        .stdout(contains("\"code\":\"provider_unsupported\""));
}

#[test]
fn missing_response_file_has_stable_code() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.args(["process", "--json", "--file", "/definitely/not/here.txt"]);
    cmd.assert()
        .failure()
        .stdout(contains("\"code\":\"file_not_found\""));
}

#[test]
fn empty_input_has_stable_code() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.args(["process", "--json"]).write_stdin("");
    cmd.assert()
        .failure()
        .stdout(contains("\"code\":\"missing_input\""));
}

#[test]
fn json_refusals_come_as_outcome_objects() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("ws");
    std::fs::create_dir_all(&root).unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--json", "--root", root.to_str().unwrap()])
        .write_stdin(r#"{"action":"create_file","content":"no path"}"#);
    cmd.assert()
        .failure()
        .stdout(contains("\"outcome\":\"missing_path\""));
}
