//! Prompt construction for per-file code generation.

/// Output rules appended to every file prompt.
const RAW_OUTPUT_RULES: &str = r#"## Output Rules

1. Output ONLY the raw contents of the file. Your reply is written to disk byte for byte.
2. Do NOT add explanations, summaries, or any prose before or after the code.
3. Do NOT wrap the code in markdown fences or any other delimiters.
4. Do NOT include the contents of any other file.
"#;

/// Build the prompt for generating the single file `path`.
///
/// The prompt carries the overall plan and the full planned file list for
/// context. It never includes other files' generated content: every file
/// is generated independently.
pub fn build_file_prompt(plan: &str, file_list: &[String], path: &str) -> String {
    let mut prompt = String::with_capacity(1024 + plan.len());

    prompt.push_str(
        "You are a senior software developer. You are building a project \
         based on this overall plan:\n\n",
    );
    prompt.push_str(plan.trim());
    prompt.push_str("\n\n");

    prompt.push_str("## Project Files\n\n");
    for file in file_list {
        if file == path {
            prompt.push_str(&format!("- `{file}` (this file)\n"));
        } else {
            prompt.push_str(&format!("- `{file}`\n"));
        }
    }
    prompt.push('\n');

    prompt.push_str(&format!(
        "## Task\n\nWrite the complete, simple and clean source code for `{path}`.\n\n"
    ));
    prompt.push_str(RAW_OUTPUT_RULES);

    prompt
}
