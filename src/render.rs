use crate::exec::ExecOutcome;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize json: {}", e),
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorOut<'a> {
    pub code: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

pub fn print_json_error(code: &str, message: &str, hint: Option<&str>) {
    let err = ErrorOut { code, message, hint };
    print_json(&err);
}

#[derive(Serialize, Debug, Clone)]
pub struct OutcomeOut<'a> {
    pub outcome: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursors: Option<usize>,
}

pub fn print_outcome(outcome: &ExecOutcome, json: bool) {
    if json {
        let (path, cursors) = match outcome {
            ExecOutcome::Wrote { path, .. } => (Some(path.display().to_string()), None),
            ExecOutcome::Inserted { cursors } => (None, Some(*cursors)),
            _ => (None, None),
        };
        print_json(&OutcomeOut { outcome: outcome.code(), path, cursors });
        return;
    }
    match outcome {
        ExecOutcome::Inserted { cursors } => println!("Inserted at {} cursor(s)", cursors),
        ExecOutcome::Wrote { path, appended: false } => println!("Created {}", path.display()),
        ExecOutcome::Wrote { path, appended: true } => println!("Appended to {}", path.display()),
        ExecOutcome::NoActiveTarget => {
            eprintln!("no active edit target; pass --target <file>")
        }
        ExecOutcome::EmptyContent => eprintln!("nothing to insert after cleaning"),
        ExecOutcome::NoSandboxRoot => eprintln!("no sandbox root; pass --root <dir>"),
        ExecOutcome::MissingPath => eprintln!("action did not carry a file path"),
        ExecOutcome::PathEscape { path } => {
            eprintln!("refused: path escapes the sandbox root: {}", path)
        }
    }
}
