//! Prompt construction for the plan stage.

/// Layout conventions included in every architect prompt.
const LAYOUT_GUIDELINES: &str = r#"## File List Guidelines

1. **Relative paths only.** Every entry is relative to the project root, e.g. `app/main.py`. Never start a path with `/` and never use `..`.
2. **One entry per file.** List each file exactly once. Do not list directories.
3. **Conventional layout.** Follow the usual source layout for the language and framework in use.
4. **Order matters.** List files in the order they should be written: shared types and configuration before the code that uses them.
5. **Keep it small.** Include only the files needed for a working first version.
"#;

/// Build the prompt sent to the generation service for the plan stage.
///
/// The prompt frames the service as a software architect, repeats the
/// user's request verbatim, and pins down what the `plan` and `files`
/// fields must contain.
pub fn build_architect_prompt(user_prompt: &str) -> String {
    let mut prompt = String::with_capacity(1024 + user_prompt.len());

    prompt.push_str("# Software Architect\n\n");
    prompt.push_str(
        "You are a software architect. Design the project described below and \
         return its architecture as structured output.\n\n",
    );
    prompt.push_str(
        "- `plan`: the architecture in 2-3 short, intuitive sentences.\n\
         - `files`: the files to create, as a list of relative paths.\n\n",
    );

    prompt.push_str(LAYOUT_GUIDELINES);
    prompt.push('\n');

    prompt.push_str("## Project Request\n\n");
    prompt.push_str(user_prompt.trim());
    prompt.push('\n');

    prompt
}
