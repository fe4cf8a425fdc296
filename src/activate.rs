//! Link activation.
//!
//! A detected link carries up to three handles: the parsed path (with
//! optional row/column), the constructed `file://` URL, and the raw text.
//! Activation tries them in that order: open the path in an external
//! editor, open the URL with the system opener, and finally open the raw
//! text as a best-effort `file://` URL.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

use crate::types::TerminalSimpleLink;

/// Errors produced while activating a link.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The resolved path does not exist on disk.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The editor command template could not be parsed into a command.
    #[error("invalid editor command: {0}")]
    InvalidEditorCommand(String),

    /// The editor process could not be spawned.
    #[error("failed to launch editor '{program}': {source}")]
    EditorLaunch {
        /// The program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The system opener failed for a URL, file or directory.
    #[error("failed to open '{target}': {source}")]
    Open {
        /// What was being opened.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The link carried nothing that could be activated.
    #[error("link has no activatable target")]
    NoTarget,
}

/// How the editor used for path activation is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorMode {
    /// Use the custom editor command template from
    /// [`ActivationConfig::editor_command`].
    Custom,
    /// Use `$EDITOR` or `$VISUAL`, falling back to the system default.
    #[default]
    EnvironmentVariable,
    /// Use the system default application for each file type.
    SystemDefault,
}

/// Host-supplied configuration for link activation.
#[derive(Debug, Clone, Default)]
pub struct ActivationConfig {
    pub editor_mode: EditorMode,
    /// Editor command template with `{file}`, `{line}` and `{col}`
    /// placeholders. Only used when the mode is [`EditorMode::Custom`].
    pub editor_command: String,
    /// Working directory for resolving relative paths.
    pub cwd: Option<String>,
}

/// Activate a link: editor first, then URL, then raw text as a `file://`
/// URL. Earlier failures are logged and the next handle is tried.
pub fn open_link(link: &TerminalSimpleLink, config: &ActivationConfig) -> Result<(), ActivationError> {
    if let Some(parsed) = &link.parsed_link {
        let (line, column) = parsed
            .suffix
            .as_ref()
            .map(|s| (s.row, s.col))
            .unwrap_or((None, None));
        match open_path_in_editor(&parsed.path.text, line, column, config) {
            Ok(()) => return Ok(()),
            Err(e) => log::debug!("editor activation failed for {:?}: {e}", parsed.path.text),
        }
    }

    if let Some(uri) = &link.uri {
        match open::that(uri.as_str()) {
            Ok(()) => return Ok(()),
            Err(e) => log::debug!("opener failed for {}: {e}", uri),
        }
    }

    if link.text.is_empty() {
        return Err(ActivationError::NoTarget);
    }
    let target = format!("file://{}", link.text);
    open::that(&target).map_err(|source| ActivationError::Open { target, source })
}

/// Open a file path in the configured editor, or a directory in the file
/// manager.
///
/// `~` is expanded against the home directory, and `./`/`../` paths are
/// resolved against the configured working directory when one is set. The
/// path must exist; detection never checks the file system, so activation
/// is where a stale or misdetected path surfaces.
pub fn open_path_in_editor(
    path: &str,
    line: Option<u32>,
    column: Option<u32>,
    config: &ActivationConfig,
) -> Result<(), ActivationError> {
    let resolved = resolve_path(path, config.cwd.as_deref());

    let path_obj = Path::new(&resolved);
    if !path_obj.exists() {
        return Err(ActivationError::PathNotFound(resolved));
    }

    // Directories always open in the system file manager
    if path_obj.is_dir() {
        log::debug!("opening directory in file manager: {resolved}");
        return open::that(&resolved).map_err(|source| ActivationError::Open {
            target: resolved,
            source,
        });
    }

    let command = match config.editor_mode {
        EditorMode::Custom => {
            if config.editor_command.is_empty() {
                // Custom mode but no command configured; use the system
                // default
                log::debug!("no custom editor configured, using system default for {resolved}");
                return open::that(&resolved).map_err(|source| ActivationError::Open {
                    target: resolved,
                    source,
                });
            }
            config.editor_command.clone()
        }
        EditorMode::EnvironmentVariable => {
            match std::env::var("EDITOR").or_else(|_| std::env::var("VISUAL")) {
                Ok(editor) => editor,
                Err(_) => {
                    log::debug!("no $EDITOR/$VISUAL set, using system default for {resolved}");
                    return open::that(&resolved).map_err(|source| ActivationError::Open {
                        target: resolved,
                        source,
                    });
                }
            }
        }
        EditorMode::SystemDefault => {
            return open::that(&resolved).map_err(|source| ActivationError::Open {
                target: resolved,
                source,
            });
        }
    };

    let parts = expand_editor_command(&command, &resolved, line, column)?;
    log::debug!("launching editor: {parts:?}");
    Command::new(&parts[0])
        .args(&parts[1..])
        .spawn()
        .map(|_| ())
        .map_err(|source| ActivationError::EditorLaunch {
            program: parts[0].clone(),
            source,
        })
}

/// Expand an editor command template, replacing `{file}`, `{line}` and
/// `{col}` placeholders.
///
/// The template is split into shell words BEFORE substitution so the file
/// path stays a single argument regardless of its content; a crafted file
/// name cannot inject extra arguments. A template without a `{file}`
/// placeholder gets the path appended as its final argument.
fn expand_editor_command(
    command: &str,
    file: &str,
    line: Option<u32>,
    column: Option<u32>,
) -> Result<Vec<String>, ActivationError> {
    let tokens = shell_words::split(command)
        .map_err(|e| ActivationError::InvalidEditorCommand(e.to_string()))?;
    if tokens.is_empty() {
        return Err(ActivationError::InvalidEditorCommand(
            "command is empty".to_string(),
        ));
    }
    let line_str = line.unwrap_or(1).to_string();
    let col_str = column.unwrap_or(1).to_string();
    let mut parts: Vec<String> = tokens
        .into_iter()
        .map(|token| {
            token
                .replace("{file}", file)
                .replace("{line}", &line_str)
                .replace("{col}", &col_str)
        })
        .collect();
    if !command.contains("{file}") {
        parts.push(file.to_string());
    }
    Ok(parts)
}

/// Expand `~` and resolve `./`/`../` against the working directory.
fn resolve_path(path: &str, cwd: Option<&str>) -> String {
    let expanded = expand_home(path);
    if (expanded.starts_with("./") || expanded.starts_with("../"))
        && let Some(working_dir) = cwd
    {
        let joined = Path::new(&expand_home(working_dir)).join(&expanded);
        // Canonicalize to resolve . and .. components; fall back to the
        // joined path when the target cannot be resolved
        return joined
            .canonicalize()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| joined.to_string_lossy().to_string());
    }
    expanded
}

fn expand_home(path: &str) -> String {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return path.replacen('~', &home.to_string_lossy(), 1);
    }
    path.to_string()
}
