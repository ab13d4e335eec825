use crate::actions::{ActionKind, ModelAction};
use crate::respond::{strip_comments, unwrap_fence};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// The active edit surface. Narrow on purpose so the executor runs without
/// any host editor behind it.
pub trait EditorSurface {
    fn has_target(&self) -> bool;
    /// Byte offsets of the active cursors/selections, any order.
    fn cursor_offsets(&self) -> Vec<usize>;
    fn insert(&mut self, offset: usize, text: &str) -> Result<()>;
}

/// The workspace filesystem bounded by a sandbox root.
pub trait WorkspaceFs {
    fn root(&self) -> Option<PathBuf>;
    /// Absence is not an error.
    fn read_if_exists(&self, path: &Path) -> Result<Option<String>>;
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// What an action execution came to. Refusals are data, not errors; only
/// real I/O failures travel the `Err` path.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Inserted { cursors: usize },
    Wrote { path: PathBuf, appended: bool },
    NoActiveTarget,
    EmptyContent,
    NoSandboxRoot,
    MissingPath,
    PathEscape { path: String },
}

impl ExecOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            ExecOutcome::Inserted { .. } => "inserted",
            ExecOutcome::Wrote { appended: false, .. } => "file_created",
            ExecOutcome::Wrote { appended: true, .. } => "file_appended",
            ExecOutcome::NoActiveTarget => "no_active_target",
            ExecOutcome::EmptyContent => "empty_content",
            ExecOutcome::NoSandboxRoot => "no_sandbox_root",
            ExecOutcome::MissingPath => "missing_path",
            ExecOutcome::PathEscape { .. } => "path_escape",
        }
    }

    pub fn is_refusal(&self) -> bool {
        !matches!(self, ExecOutcome::Inserted { .. } | ExecOutcome::Wrote { .. })
    }
}

/// Run a validated action against the injected capabilities.
pub fn execute(
    action: &ModelAction,
    editor: &mut dyn EditorSurface,
    fs: &dyn WorkspaceFs,
) -> Result<ExecOutcome> {
    match action.kind {
        ActionKind::InsertCode => insert_code(action, editor),
        ActionKind::CreateFile => file_action(action, fs, false),
        ActionKind::AppendFile => file_action(action, fs, true),
    }
}

fn insert_code(action: &ModelAction, editor: &mut dyn EditorSurface) -> Result<ExecOutcome> {
    if !editor.has_target() {
        return Ok(ExecOutcome::NoActiveTarget);
    }
    let cleaned = strip_comments(&unwrap_fence(action.content.as_deref().unwrap_or_default()));
    if cleaned.is_empty() {
        return Ok(ExecOutcome::EmptyContent);
    }
    insert_at_cursors(editor, &cleaned)
}

/// Insert `text` at every active cursor, guaranteeing exactly one trailing
/// newline. Also the landing point for pipeline text the caller wants placed
/// in the editor.
pub fn insert_at_cursors(editor: &mut dyn EditorSurface, text: &str) -> Result<ExecOutcome> {
    if !editor.has_target() {
        return Ok(ExecOutcome::NoActiveTarget);
    }
    let mut body = text.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    let mut offsets = editor.cursor_offsets();
    offsets.sort_unstable();
    // Back to front so earlier offsets stay valid while the buffer grows.
    for off in offsets.iter().rev() {
        editor.insert(*off, &body)?;
    }
    Ok(ExecOutcome::Inserted { cursors: offsets.len() })
}

fn file_action(action: &ModelAction, fs: &dyn WorkspaceFs, append: bool) -> Result<ExecOutcome> {
    let Some(root) = fs.root() else {
        return Ok(ExecOutcome::NoSandboxRoot);
    };
    let Some(raw_path) = action.path.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Ok(ExecOutcome::MissingPath);
    };

    let segments = sanitize_segments(raw_path);
    if segments.is_empty() {
        return Ok(ExecOutcome::MissingPath);
    }
    // Confinement comes strictly before any write or mkdir.
    let Some(target) = resolve_confined(&root, &segments) else {
        return Ok(ExecOutcome::PathEscape { path: raw_path.to_string() });
    };
    if segments.len() > 1 {
        if let Some(parent) = target.parent() {
            fs.create_dir_all(parent)?;
        }
    }

    let content = action.content.as_deref().unwrap_or_default();
    if append {
        let existing = fs.read_if_exists(&target)?.unwrap_or_default();
        let mut merged = existing;
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(content);
        fs.write(&target, &merged)?;
        Ok(ExecOutcome::Wrote { path: target, appended: true })
    } else {
        // create_file overwrites unconditionally
        fs.write(&target, content)?;
        Ok(ExecOutcome::Wrote { path: target, appended: false })
    }
}

/// Strip leading separators and split on runs of `/` or `\`, dropping the
/// empty segments a `//` produces.
fn sanitize_segments(raw: &str) -> Vec<&str> {
    raw.trim_start_matches(['/', '\\'])
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join segments onto the root, resolving `.`/`..` lexically. Any result
/// that is not strictly inside the root is refused.
fn resolve_confined(root: &Path, segments: &[&str]) -> Option<PathBuf> {
    let mut kept: Vec<&str> = Vec::new();
    for seg in segments {
        match *seg {
            "." => {}
            ".." => {
                if kept.pop().is_none() {
                    return None;
                }
            }
            _ => kept.push(seg),
        }
    }
    if kept.is_empty() {
        return None;
    }
    let mut target = root.to_path_buf();
    for seg in kept {
        target.push(seg);
    }
    if target.starts_with(root) && target != *root {
        Some(target)
    } else {
        None
    }
}

/// Real filesystem bounded by an on-disk root.
pub struct DiskWorkspace {
    root: Option<PathBuf>,
}

impl DiskWorkspace {
    pub fn new(root: Option<PathBuf>) -> Self {
        // Resolve to an absolute root so the confinement prefix is stable
        let root = root.map(|r| std::fs::canonicalize(&r).unwrap_or(r));
        Self { root }
    }
}

impl WorkspaceFs for DiskWorkspace {
    fn root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn read_if_exists(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading file: {}", path.display())),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content).with_context(|| format!("writing file: {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directories: {}", path.display()))
    }
}

/// In-memory edit buffer over a file, single cursor at end of buffer.
pub struct FileBuffer {
    path: PathBuf,
    text: String,
}

impl FileBuffer {
    pub fn open(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).with_context(|| format!("opening target: {}", path.display())),
        };
        Ok(Self { path: path.to_path_buf(), text })
    }

    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, &self.text)
            .with_context(|| format!("saving target: {}", self.path.display()))
    }
}

impl EditorSurface for FileBuffer {
    fn has_target(&self) -> bool {
        true
    }

    fn cursor_offsets(&self) -> Vec<usize> {
        vec![self.text.len()]
    }

    fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            bail!("insert offset {} out of bounds for target buffer", offset);
        }
        self.text.insert_str(offset, text);
        Ok(())
    }
}

/// Editor capability when no target is open.
pub struct NullEditor;

impl EditorSurface for NullEditor {
    fn has_target(&self) -> bool {
        false
    }

    fn cursor_offsets(&self) -> Vec<usize> {
        Vec::new()
    }

    fn insert(&mut self, _offset: usize, _text: &str) -> Result<()> {
        bail!("no active edit target")
    }
}
