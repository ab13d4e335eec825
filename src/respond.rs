use crate::actions::{parse_action, ModelAction};
use regex::Regex;

const FENCE: &str = "```";

/// Line-comment prefix used when annotating inserted code for a language.
pub fn comment_prefix_for(language_id: &str) -> &'static str {
    match language_id {
        "python" | "shellscript" | "yaml" => "# ",
        "html" => "<!-- ",
        _ => "// ",
    }
}

/// Closing counterpart of [`comment_prefix_for`]; empty for line comments.
pub fn comment_suffix_for(language_id: &str) -> &'static str {
    match language_id {
        "html" => " -->",
        _ => "",
    }
}

pub fn detect_language_from_path(path: &std::path::Path) -> String {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "py" => "python",
        "sh" | "bash" => "shellscript",
        "yml" | "yaml" => "yaml",
        "html" | "htm" => "html",
        "rs" => "rust",
        "js" => "javascript",
        "ts" => "typescript",
        "go" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "cc" => "cpp",
        other => return other.to_string(),
    }
    .to_string()
}

/// Extract the body of the first fenced block in `text`, or fall back to the
/// trimmed input when no well-formed fence pair is present.
pub fn unwrap_fence(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let first = text.find(FENCE);
    let last = text.rfind(FENCE);
    if let (Some(first), Some(last)) = (first, last) {
        // Overlapping occurrences (a run of 4-5 backticks) are not a pair.
        if last >= first + FENCE.len() {
            let body = &text[first + FENCE.len()..last];
            return strip_language_tag(body).trim().to_string();
        }
    }
    // No fence, or a single stray marker
    text.trim().to_string()
}

/// Drop the opening language-tag line of a fence body, e.g. the `ts` in
/// "```ts\n...". The tag may be empty; any other first line is real content.
fn strip_language_tag(body: &str) -> &str {
    let first_line = body.lines().next().unwrap_or("");
    let is_tag = first_line
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '.' | '-'));
    if is_tag {
        match body.find('\n') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// Remove comment-like text from extracted code.
///
/// Block spans (`<!-- -->`, `/* */`) go first so line markers inside them
/// never reach the line pass. Whole lines starting with `//` or `#` are
/// deleted, keeping shebangs. Blank-line runs collapse. Not aware of string
/// literals; a `//` inside a quoted string still counts as a comment start.
pub fn strip_comments(text: &str) -> String {
    let html_re = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let block_re = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    let without_html = html_re.replace_all(text, "");
    let without_blocks = block_re.replace_all(&without_html, "");

    let kept: Vec<&str> = without_blocks
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("#!") {
                return true;
            }
            !(trimmed.starts_with("//") || trimmed.starts_with('#'))
        })
        .map(|line| line.trim_end())
        .filter(|line| !line.is_empty())
        .collect();

    kept.join("\n").trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedResponse {
    /// A structured file operation embedded in the response.
    Action(ModelAction),
    /// Cleaned, insertable code text. May be empty; the caller treats an
    /// empty result as a warning no-op.
    Text(String),
}

/// Normalize a raw model response: an embedded action wins; otherwise the
/// text is unwrapped and stripped into insertable code.
pub fn process_response(raw: &str) -> ProcessedResponse {
    if let Some(action) = parse_action(raw) {
        return ProcessedResponse::Action(action);
    }
    ProcessedResponse::Text(strip_comments(&unwrap_fence(raw)))
}
