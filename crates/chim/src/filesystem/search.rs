use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{display, sorted_entries, GlobPattern, SecureFileAccess};
use crate::errors::{ToolError, ToolResult};

/// A file whose name matched, optionally with the matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub path: String,
    /// 1-based line number of a keyword hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub directory: String,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub count: usize,
    pub matches: Vec<SearchMatch>,
    pub truncated: bool,
}

struct Query<'a> {
    glob: GlobPattern,
    keyword: Option<String>,
    limit: usize,
    access: &'a SecureFileAccess,
}

impl SecureFileAccess {
    /// Find files under `directory` whose names match `pattern`. With a
    /// keyword, every line containing it (case-insensitively) is reported
    /// instead of the bare file.
    pub fn search_files(
        &self,
        directory: &str,
        pattern: &str,
        keyword: Option<&str>,
    ) -> ToolResult<SearchResults> {
        let root = self.validate_directory(directory)?;
        let glob = GlobPattern::new(pattern)
            .map_err(|e| ToolError::InvalidParameters(format!("Invalid pattern: {}", e)))?;
        let keyword = keyword.filter(|k| !k.is_empty());

        let query = Query {
            glob,
            keyword: keyword.map(str::to_lowercase),
            limit: self.config().max_search_matches,
            access: self,
        };

        let mut matches = Vec::new();
        let truncated = query
            .walk(&root, true, &mut matches)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to search directory: {}", e)))?;

        tracing::debug!(
            directory = %root.display(),
            pattern,
            keyword = keyword.unwrap_or_default(),
            count = matches.len(),
            truncated,
            "searched directory"
        );

        Ok(SearchResults {
            directory: display(&root),
            pattern: pattern.to_string(),
            keyword: keyword.map(str::to_string),
            count: matches.len(),
            matches,
            truncated,
        })
    }
}

impl Query<'_> {
    /// Returns `true` once a match beyond the cap was found
    fn walk(&self, dir: &Path, top: bool, out: &mut Vec<SearchMatch>) -> std::io::Result<bool> {
        let children = match sorted_entries(dir) {
            Ok(children) => children,
            Err(_) if !top => return Ok(false),
            Err(e) => return Err(e),
        };

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let path = child.path();
            let Some((metadata, is_symlink)) = self.access.entry_metadata(&path) else {
                continue;
            };

            if metadata.is_dir() {
                if !is_symlink
                    && !self.access.is_blocked_directory(&name)
                    && self.walk(&path, false, out)?
                {
                    return Ok(true);
                }
                continue;
            }

            if !self.glob.is_match(&name) {
                continue;
            }
            let stopped = match &self.keyword {
                None => self.push(
                    out,
                    SearchMatch {
                        path: display(&path),
                        line: None,
                        content: None,
                    },
                ),
                Some(keyword) => self.scan(&path, metadata.len(), keyword, out),
            };
            if stopped {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn scan(&self, path: &Path, size: u64, keyword: &str, out: &mut Vec<SearchMatch>) -> bool {
        if self.access.is_blocked_extension(path)
            || size > self.access.config().max_search_file_size
        {
            return false;
        }
        let Ok(bytes) = fs::read(path) else {
            return false;
        };
        let text = String::from_utf8_lossy(&bytes);

        for (index, line) in text.split('\n').enumerate() {
            if line.to_lowercase().contains(keyword) {
                let hit = SearchMatch {
                    path: display(path),
                    line: Some(index + 1),
                    content: Some(line.trim().to_string()),
                };
                if self.push(out, hit) {
                    return true;
                }
            }
        }
        false
    }

    /// Returns `true` instead of pushing when the cap is already full
    fn push(&self, out: &mut Vec<SearchMatch>, hit: SearchMatch) -> bool {
        if out.len() >= self.limit {
            return true;
        }
        out.push(hit);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::FileAccessConfig;
    use super::*;
    use tempfile::TempDir;

    fn setup(configure: impl FnOnce(&mut FileAccessConfig)) -> (TempDir, SecureFileAccess) {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("ext/plugins")).unwrap();
        fs::create_dir_all(root.path().join("node_modules")).unwrap();
        fs::write(root.path().join("a.txt"), "alpha\n  Needle in line two  \nomega\n").unwrap();
        fs::write(root.path().join("B.TXT"), "nothing here").unwrap();
        fs::write(root.path().join("notes.md"), "needle").unwrap();
        fs::write(root.path().join("ext/plugins/c.txt"), "NEEDLE\nneedle again").unwrap();
        fs::write(root.path().join("node_modules/hidden.txt"), "needle").unwrap();

        let mut config = FileAccessConfig::with_allowed_dirs([root.path().to_string_lossy()]);
        configure(&mut config);
        let access = SecureFileAccess::new(config).unwrap();
        (root, access)
    }

    fn paths(results: &SearchResults, root: &TempDir) -> Vec<String> {
        results
            .matches
            .iter()
            .map(|m| {
                Path::new(&m.path)
                    .strip_prefix(root.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn test_name_search_is_case_insensitive_and_recursive() {
        let (root, access) = setup(|_| {});
        let results = access
            .search_files(&root.path().to_string_lossy(), "*.txt", None)
            .unwrap();
        assert_eq!(
            paths(&results, &root),
            vec!["B.TXT", "a.txt", "ext/plugins/c.txt"]
        );
        assert!(results.matches.iter().all(|m| m.line.is_none() && m.content.is_none()));
        assert_eq!(results.count, 3);
        assert!(results.keyword.is_none());
        assert!(!results.truncated);
    }

    #[test]
    fn test_keyword_reports_lines() {
        let (root, access) = setup(|_| {});
        let results = access
            .search_files(&root.path().to_string_lossy(), "*.txt", Some("needle"))
            .unwrap();

        let hits: Vec<_> = results
            .matches
            .iter()
            .map(|m| (m.line.unwrap(), m.content.clone().unwrap()))
            .collect();
        assert_eq!(
            hits,
            vec![
                (2, "Needle in line two".to_string()),
                (1, "NEEDLE".to_string()),
                (2, "needle again".to_string()),
            ]
        );
        assert_eq!(results.keyword.as_deref(), Some("needle"));
    }

    #[test]
    fn test_empty_keyword_is_name_only() {
        let (root, access) = setup(|_| {});
        let results = access
            .search_files(&root.path().to_string_lossy(), "notes.md", Some(""))
            .unwrap();
        assert_eq!(results.count, 1);
        assert!(results.matches[0].line.is_none());
        assert!(results.keyword.is_none());
    }

    #[test]
    fn test_match_cap() {
        let (root, access) = setup(|config| config.max_search_matches = 2);
        let results = access
            .search_files(&root.path().to_string_lossy(), "*", Some("needle"))
            .unwrap();
        assert_eq!(results.count, 2);
        assert!(results.truncated);
    }

    #[test]
    fn test_exact_match_count_is_not_truncated() {
        // four hits: a.txt, notes.md and two lines of ext/plugins/c.txt
        let (root, access) = setup(|config| config.max_search_matches = 4);
        let results = access
            .search_files(&root.path().to_string_lossy(), "*", Some("needle"))
            .unwrap();
        assert_eq!(results.count, 4);
        assert!(!results.truncated);

        let (root, access) = setup(|config| config.max_search_matches = 3);
        let results = access
            .search_files(&root.path().to_string_lossy(), "*", Some("needle"))
            .unwrap();
        assert_eq!(results.count, 3);
        assert!(results.truncated);
    }

    #[test]
    fn test_content_search_skips_blocked_and_large_files() {
        let (root, access) = setup(|config| config.max_search_file_size = 16);
        fs::write(root.path().join("dump.db"), "needle").unwrap();
        fs::write(root.path().join("long.txt"), format!("{}needle", "x".repeat(32))).unwrap();

        let results = access
            .search_files(&root.path().to_string_lossy(), "*", Some("needle"))
            .unwrap();
        let found = paths(&results, &root);
        assert!(!found.iter().any(|p| p == "dump.db" || p == "long.txt"));
        assert!(found.contains(&"notes.md".to_string()));

        // name-only search still reports blocked extensions
        let names = access
            .search_files(&root.path().to_string_lossy(), "*.db", None)
            .unwrap();
        assert_eq!(names.count, 1);
    }

    #[test]
    fn test_search_requires_directory_inside_allow_list() {
        let (_root, access) = setup(|_| {});
        assert!(matches!(
            access.search_files("a.txt", "*", None),
            Err(ToolError::NotADirectory(_))
        ));
        assert!(matches!(
            access.search_files("/etc", "*", None),
            Err(ToolError::AccessDenied(_))
        ));
    }
}
