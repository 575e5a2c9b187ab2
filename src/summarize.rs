//! Structure summary: one generation call over the collected file list.

use crate::generation::{generate_text, GenerationProvider};
use crate::models::RepoFile;

pub const NO_FILES_MESSAGE: &str = "No code files found in this repository.";

/// Build the summary prompt from the first `max_files` paths, in collected order.
pub fn build_summary_prompt(files: &[RepoFile], max_files: usize) -> String {
    let listed: Vec<&str> = files
        .iter()
        .take(max_files)
        .map(|f| f.relative_path.as_str())
        .collect();

    let mut prompt = String::new();
    prompt.push_str("You are analyzing a project's code structure for a student.\n\n");
    prompt.push_str(&format!(
        "Here is a (possibly partial) list of code files in the project (up to {} files):\n\n",
        max_files
    ));
    prompt.push_str(&listed.join("\n"));
    prompt.push_str(
        "\n\nTasks:\n\
         1. Group files into logical areas like API, models, UI, utils, configuration, etc.\n\
         2. Explain what each group probably does in simple language.\n\
         3. Point out likely entry points such as main.py, app.py, index.js, server.js, main.rs, etc.\n\
         4. Tell a new contributor where they should start reading the code to understand:\n\
         \x20  - how the app starts\n\
         \x20  - where the core logic lives\n\
         \x20  - where configuration lives\n\
         5. Always reference file paths explicitly when you mention them.\n\n\
         If you feel some parts are missing because not all files are shown, state that clearly.\n",
    );

    if files.len() > max_files {
        prompt.push_str(&format!(
            "\nNote: only {} of {} files are listed.\n",
            max_files,
            files.len()
        ));
    }

    prompt
}

/// Ask the generator for an architectural overview of `files`.
///
/// An empty list short-circuits to [`NO_FILES_MESSAGE`] without a provider call.
pub async fn summarize_structure(
    generator: &dyn GenerationProvider,
    files: &[RepoFile],
    max_files: usize,
    max_tokens: u32,
) -> String {
    if files.is_empty() {
        return NO_FILES_MESSAGE.to_string();
    }

    tracing::debug!(files = files.len(), max_files, "summarizing structure");
    generate_text(generator, &build_summary_prompt(files, max_files), max_tokens).await
}
