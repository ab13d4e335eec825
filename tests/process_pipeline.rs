use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use tempfile::TempDir;

fn cmate(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cmate").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("XDG_DATA_HOME", temp.path().join(".local"));
    cmd
}

#[test]
fn fenced_response_prints_cleaned_code() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.arg("process")
        .write_stdin("Here you go:\n```ts\n// helper\nconst x = 1;\n```\nEnjoy!");
    cmd.assert().success().stdout("const x = 1;\n");
}

#[test]
fn create_file_action_lands_under_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("ws");
    fs::create_dir_all(&root).unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--root", root.to_str().unwrap()]).write_stdin(
        r#"Creating it now: {"action":"create_file","path":"src/new.ts","content":"export {};"}"#,
    );
    cmd.assert().success().stdout(contains("Created"));

    let written = fs::read_to_string(root.join("src/new.ts")).unwrap();
    assert_eq!(written, "export {};");
}

#[test]
fn append_action_separates_with_newline() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("ws");
    fs::create_dir_all(&root).unwrap();

    for content in ["A", "B"] {
        let mut cmd = cmate(&temp);
        cmd.args(["process", "--root", root.to_str().unwrap()]).write_stdin(format!(
            r#"{{"action":"append_file","path":"notes.txt","content":"{}"}}"#,
            content
        ));
        cmd.assert().success().stdout(contains("Appended"));
    }

    assert_eq!(fs::read_to_string(root.join("notes.txt")).unwrap(), "A\nB");
}

#[test]
fn path_escape_is_refused_and_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("ws");
    fs::create_dir_all(&root).unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--root", root.to_str().unwrap()]).write_stdin(
        r#"{"action":"create_file","path":"../evil.txt","content":"x"}"#,
    );
    cmd.assert()
        .failure()
        .stderr(contains("escapes the sandbox root"));

    assert!(!temp.path().join("evil.txt").exists());
    assert!(!root.join("evil.txt").exists());
}

#[test]
fn unsupported_action_falls_back_to_text() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("ws");
    fs::create_dir_all(&root).unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--root", root.to_str().unwrap()])
        .write_stdin(r#"{"action":"delete_file","path":"notes.txt"}"#);
    // No action recognized; the blob is treated as plain text
    let assert = cmd.assert().success();
    assert.stdout(contains("delete_file"));
    assert!(!root.join("notes.txt").exists());
}

#[test]
fn comment_only_response_is_a_warning_noop() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.arg("process")
        .write_stdin("```js\n// nothing but comments\n```");
    cmd.assert()
        .success()
        .stderr(contains("nothing to insert"));
}

#[test]
fn insert_code_without_target_reports_refusal() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.arg("process")
        .write_stdin(r#"{"action":"insert_code","content":"let x = 1;"}"#);
    cmd.assert()
        .failure()
        .stderr(contains("no active edit target"));
}

#[test]
fn empty_input_is_an_error() {
    let temp = TempDir::new().unwrap();
    let mut cmd = cmate(&temp);
    cmd.arg("process").write_stdin("   ");
    cmd.assert().failure();
}
