use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{display, sorted_entries, EntryKind, FileSystemEntry, SecureFileAccess};
use crate::errors::{ToolError, ToolResult};

/// Result of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub directory: String,
    pub recursive: bool,
    pub count: usize,
    pub entries: Vec<FileSystemEntry>,
    /// Set when the entry budget cut the walk short
    pub truncated: bool,
}

impl SecureFileAccess {
    /// List a directory, optionally descending into subdirectories up to the
    /// configured depth. At most `max_list_entries` entries are returned.
    pub fn list_files(&self, directory: &str, recursive: bool) -> ToolResult<Listing> {
        let root = self.validate_directory(directory)?;

        let mut entries = Vec::new();
        let truncated = self
            .collect_entries(&root, recursive, 0, &mut entries)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to list directory: {}", e)))?;

        tracing::debug!(
            directory = %root.display(),
            recursive,
            count = entries.len(),
            truncated,
            "listed directory"
        );

        Ok(Listing {
            directory: display(&root),
            recursive,
            count: entries.len(),
            entries,
            truncated,
        })
    }

    /// Returns `true` once the entry budget is exhausted
    fn collect_entries(
        &self,
        dir: &Path,
        recursive: bool,
        depth: usize,
        out: &mut Vec<FileSystemEntry>,
    ) -> std::io::Result<bool> {
        let limit = self.config().max_list_entries;
        let children = match sorted_entries(dir) {
            Ok(children) => children,
            // nested directories we cannot read are skipped
            Err(_) if depth > 0 => return Ok(false),
            Err(e) => return Err(e),
        };

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            if self.is_blocked_directory(&name) {
                continue;
            }
            let path = child.path();
            let Some((metadata, is_symlink)) = self.entry_metadata(&path) else {
                continue;
            };

            if out.len() >= limit {
                return Ok(true);
            }

            let is_dir = metadata.is_dir();
            out.push(FileSystemEntry {
                name,
                kind: if is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: metadata.len(),
                path: display(&path),
            });

            if recursive && is_dir && !is_symlink && depth < self.config().max_recursive_depth {
                if self.collect_entries(&path, recursive, depth + 1, out)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
