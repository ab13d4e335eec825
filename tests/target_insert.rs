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
fn text_response_is_inserted_at_end_of_target() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("main.ts");
    fs::write(&target, "const a = 1;\n").unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--target", target.to_str().unwrap()])
        .write_stdin("```ts\nconst b = 2;\n```");
    cmd.assert().success().stdout(contains("Inserted at 1 cursor"));

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "const a = 1;\nconst b = 2;\n"
    );
}

#[test]
fn insert_code_action_cleans_before_inserting() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("main.ts");
    fs::write(&target, "start\n").unwrap();

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--target", target.to_str().unwrap()]).write_stdin(
        r#"{"action":"insert_code","content":"```js\n// note\ncode();\n```"}"#,
    );
    cmd.assert().success().stdout(contains("Inserted"));

    assert_eq!(fs::read_to_string(&target).unwrap(), "start\ncode();\n");
}

#[test]
fn annotate_prefixes_a_comment_line() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("script.py");
    fs::write(&target, "").unwrap();

    let mut cmd = cmate(&temp);
    cmd.args([
        "process",
        "--target",
        target.to_str().unwrap(),
        "--annotate",
    ])
    .write_stdin("```python\nprint(1)\n```");
    cmd.assert().success();

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# generated by codemate\nprint(1)\n"
    );
}

#[test]
fn missing_target_file_is_created_on_insert() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("fresh.rs");

    let mut cmd = cmate(&temp);
    cmd.args(["process", "--target", target.to_str().unwrap()])
        .write_stdin("```rust\nfn f() {}\n```");
    cmd.assert().success();

    assert_eq!(fs::read_to_string(&target).unwrap(), "fn f() {}\n");
}
