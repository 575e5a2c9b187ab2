//! Repository file collector.
//!
//! Walks a working copy and produces one [`RepoFile`] per regular file,
//! skipping `.git` and anything matched by the configured exclude globs.
//! With `code_only` the result is narrowed to known source-code extensions
//! (plus a few conventional extension-less build files).
//!
//! The walk is sorted by file name so two runs over the same tree return
//! files in the same order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::ReposConfig;
use crate::models::RepoFile;

/// Extensions treated as source code when `code_only` is set and no
/// explicit list is configured.
pub const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".pyi", ".js", ".mjs", ".cjs", ".jsx", ".ts", ".tsx", ".vue", ".svelte", ".java",
    ".kt", ".kts", ".scala", ".groovy", ".gradle", ".go", ".rs", ".c", ".h", ".cc", ".cpp",
    ".cxx", ".hpp", ".hh", ".cs", ".fs", ".rb", ".php", ".swift", ".m", ".mm", ".dart", ".lua",
    ".r", ".jl", ".ex", ".exs", ".erl", ".hs", ".ml", ".clj", ".zig", ".sh", ".bash", ".zsh",
    ".ps1", ".sql", ".html", ".css", ".scss", ".sass", ".less", ".json", ".yaml", ".yml",
    ".toml", ".ini", ".cfg", ".xml", ".proto", ".graphql", ".md", ".rst", ".txt",
];

/// Extension-less files that are still worth indexing.
const CODE_FILENAMES: &[&str] = &["Dockerfile", "Makefile", "Rakefile", "Gemfile", "Procfile"];

/// Which files a walk should keep.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub code_only: bool,
    /// Lower-cased, dot-prefixed extensions. Empty means [`CODE_EXTENSIONS`].
    pub extensions: Vec<String>,
    pub exclude_globs: Vec<String>,
}

impl CollectOptions {
    /// Every file except `.git`.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_config(repos: &ReposConfig) -> Self {
        Self {
            code_only: repos.code_only,
            extensions: repos
                .extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            exclude_globs: repos.exclude_globs.clone(),
        }
    }

    fn keeps(&self, file_name: &str, extension: &str) -> bool {
        if !self.code_only {
            return true;
        }
        if self.extensions.is_empty() {
            CODE_EXTENSIONS.contains(&extension) || CODE_FILENAMES.contains(&file_name)
        } else {
            self.extensions.iter().any(|e| e == extension)
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Walk `root` and return metadata for every file that passes `options`.
pub fn list_repo_files(root: &Path, options: &CollectOptions) -> Result<Vec<RepoFile>> {
    if !root.is_dir() {
        bail!("Repository root is not a directory: {}", root.display());
    }

    let exclude_set = build_globset(&options.exclude_globs)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        if !options.keeps(&file_name, &extension) {
            continue;
        }

        files.push(RepoFile {
            relative_path: rel_str,
            full_path: path.to_string_lossy().to_string(),
            extension,
        });
    }

    Ok(files)
}

/// Render the directory tree under `root` with box-drawing connectors.
///
/// Entries are sorted by name and `.git` is left out. Directories that
/// cannot be listed render as empty.
pub fn repo_structure(root: &Path) -> String {
    let mut lines = Vec::new();
    build_tree(root, "", &mut lines);
    lines.join("\n")
}

fn build_tree(dir: &Path, prefix: &str, lines: &mut Vec<String>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = read
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != ".git")
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let count = entries.len();
    for (i, entry) in entries.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        lines.push(format!(
            "{}{}{}",
            prefix,
            connector,
            entry.file_name().to_string_lossy()
        ));

        let path = entry.path();
        if path.is_dir() {
            let extension = if is_last { "    " } else { "│   " };
            build_tree(&path, &format!("{}{}", prefix, extension), lines);
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
