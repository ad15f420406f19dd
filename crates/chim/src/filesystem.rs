//! Read-only file access confined to an operator-defined allow-list.
//!
//! Every operation goes through [`SecureFileAccess::validate_path`] before it
//! touches the disk, so nothing outside the allowed base directories is ever
//! observed, not even its existence. Listing and search additionally drop
//! blocklisted directory names, and content reads refuse blocklisted
//! extensions. Walks are bounded by explicit depth and count budgets.
mod glob;
mod listing;
mod search;
mod system;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::{ToolError, ToolResult};

pub use glob::GlobPattern;
pub use listing::Listing;
pub use search::{SearchMatch, SearchResults};
pub use system::FileSystemSystem;

pub const DEFAULT_HERIKA_SERVER_PATH: &str = "/var/www/html/HerikaServer";
pub const DEFAULT_SERVICES_PATH: &str = "/home/dwemer";

const DEFAULT_BLOCKED_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "mp4", "avi", "mov", "flac", "ogg", "aac", // media
    "bin", "dat", "db", "sqlite", "sqlite3", // data stores
    "pt", "pth", "onnx", "pkl", "pickle", "safetensors", "ckpt", // model weights
    "exe", "dll", "so", "dylib", // native binaries
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", // images
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", // archives
    "woff", "woff2", "ttf", "otf", "eot", // fonts
];

const DEFAULT_BLOCKED_DIRECTORIES: &[&str] = &["node_modules", ".git", "__pycache__", ".venv", "venv"];

/// Operator-supplied limits for file access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAccessConfig {
    /// Base directories under which access is permitted; `~` is expanded
    pub allowed_dirs: Vec<String>,
    /// Extensions refused for reading and content search, with or without the dot
    pub blocked_extensions: Vec<String>,
    /// Directory names never listed or descended into
    pub blocked_directories: Vec<String>,
    pub max_file_size: u64,
    pub max_list_entries: usize,
    pub max_recursive_depth: usize,
    pub max_search_matches: usize,
    pub max_search_file_size: u64,
}

impl Default for FileAccessConfig {
    fn default() -> Self {
        let herika = std::env::var("HERIKA_SERVER_PATH")
            .unwrap_or_else(|_| DEFAULT_HERIKA_SERVER_PATH.to_string());
        Self {
            allowed_dirs: vec![herika, DEFAULT_SERVICES_PATH.to_string()],
            blocked_extensions: DEFAULT_BLOCKED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            blocked_directories: DEFAULT_BLOCKED_DIRECTORIES.iter().map(|s| s.to_string()).collect(),
            max_file_size: 1024 * 1024,
            max_list_entries: 500,
            max_recursive_depth: 3,
            max_search_matches: 100,
            max_search_file_size: 512 * 1024,
        }
    }
}

impl FileAccessConfig {
    /// Config allowing only the given directories, with default limits
    pub fn with_allowed_dirs<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_dirs: dirs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub size: u64,
    pub content: String,
}

/// The allow-list choke point shared by the file tools
#[derive(Debug, Clone)]
pub struct SecureFileAccess {
    config: FileAccessConfig,
    bases: Vec<PathBuf>,
    canonical_bases: Vec<PathBuf>,
    blocked_extensions: Vec<String>,
}

impl SecureFileAccess {
    pub fn new(config: FileAccessConfig) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut bases = Vec::new();
        for dir in &config.allowed_dirs {
            let expanded = shellexpand::tilde(dir.trim());
            if expanded.is_empty() {
                continue;
            }
            let base = normalize(&cwd.join(&*expanded));
            if !bases.contains(&base) {
                bases.push(base);
            }
        }
        if bases.is_empty() {
            bail!("At least one allowed directory must be configured for file access");
        }

        // Bases that do not exist yet keep their lexical form
        let canonical_bases = bases
            .iter()
            .map(|base| fs::canonicalize(base).unwrap_or_else(|_| base.clone()))
            .collect();

        let blocked_extensions = config
            .blocked_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Ok(Self {
            config,
            bases,
            canonical_bases,
            blocked_extensions,
        })
    }

    pub fn config(&self) -> &FileAccessConfig {
        &self.config
    }

    /// Allowed base directories, absolute and normalized, in configured order
    pub fn allowed_dirs(&self) -> &[PathBuf] {
        &self.bases
    }

    /// Resolve `input` to an absolute path inside the allow-list.
    ///
    /// Relative inputs resolve against the first allowed directory. The
    /// allow-list check runs on the lexical path before anything is read
    /// from disk; the symlink-resolved target must also stay inside.
    pub fn validate_path(&self, input: &str) -> ToolResult<PathBuf> {
        // a blank path names no location inside the allow-list
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ToolError::AccessDenied(input.to_string()));
        }

        let resolved = normalize(&self.bases[0].join(trimmed));
        if !self.bases.iter().any(|base| resolved.starts_with(base)) {
            return Err(ToolError::AccessDenied(input.to_string()));
        }

        let canonical =
            fs::canonicalize(&resolved).map_err(|_| ToolError::NotAccessible(input.to_string()))?;
        if !self.is_inside_allowed(&canonical) {
            return Err(ToolError::AccessDenied(input.to_string()));
        }

        let readable = if canonical.is_dir() {
            fs::read_dir(&canonical).is_ok()
        } else {
            fs::File::open(&canonical).is_ok()
        };
        if !readable {
            return Err(ToolError::NotAccessible(input.to_string()));
        }

        Ok(resolved)
    }

    /// Read a whole text file
    pub fn read_file(&self, input: &str) -> ToolResult<FileContent> {
        let path = self.validate_path(input)?;

        if self.is_blocked_extension(&path) {
            let ext = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            return Err(ToolError::BlockedExtension(ext));
        }

        let metadata = fs::metadata(&path).map_err(|_| ToolError::NotAccessible(input.to_string()))?;
        if !metadata.is_file() {
            return Err(ToolError::NotAFile(input.to_string()));
        }
        if metadata.len() > self.config.max_file_size {
            return Err(ToolError::TooLarge {
                size: metadata.len(),
                max: self.config.max_file_size,
            });
        }

        let bytes = fs::read(&path)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read file: {}", e)))?;
        let content = String::from_utf8(bytes).map_err(|_| {
            ToolError::ExecutionFailed(format!("File is not valid UTF-8 text: {}", input))
        })?;

        Ok(FileContent {
            path: display(&path),
            size: metadata.len(),
            content,
        })
    }

    /// Validate `input` and require it to be a directory
    fn validate_directory(&self, input: &str) -> ToolResult<PathBuf> {
        let path = self.validate_path(input)?;
        let metadata = fs::metadata(&path).map_err(|_| ToolError::NotAccessible(input.to_string()))?;
        if !metadata.is_dir() {
            return Err(ToolError::NotADirectory(input.to_string()));
        }
        Ok(path)
    }

    /// Case-insensitive match of the final extension against the blocklist
    pub fn is_blocked_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.blocked_extensions.contains(&ext))
    }

    pub fn is_blocked_directory(&self, name: &str) -> bool {
        self.config.blocked_directories.iter().any(|blocked| blocked == name)
    }

    fn is_inside_allowed(&self, canonical: &Path) -> bool {
        self.canonical_bases.iter().any(|base| canonical.starts_with(base))
    }

    /// Metadata for an entry found while walking, following a symlink only
    /// when its target stays inside the allow-list. The flag reports whether
    /// the entry was a symlink; walks never descend through one.
    fn entry_metadata(&self, path: &Path) -> Option<(fs::Metadata, bool)> {
        let metadata = fs::symlink_metadata(path).ok()?;
        if !metadata.file_type().is_symlink() {
            return Some((metadata, false));
        }
        let target = fs::canonicalize(path).ok()?;
        if !self.is_inside_allowed(&target) {
            tracing::debug!(path = %path.display(), "skipping symlink leaving allowed directories");
            return None;
        }
        fs::metadata(&target).ok().map(|metadata| (metadata, true))
    }
}

/// Collapse `.` and `..` without consulting the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Directory entries sorted by file name, so results are reproducible
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}
