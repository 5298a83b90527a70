// src/classify/prompt.rs
// Categorization prompt construction
//
// Prompts are pure functions of the candidate set: identical inputs must give
// byte-identical output, so nothing time- or randomness-dependent belongs here.

use crate::taxonomy::Category;
use std::fmt::Write;

/// Placeholder substituted with the document's extracted text at invocation time.
pub const DOCUMENT_PLACEHOLDER: &str = "{document_text}";

/// Fixed domain framing shared by both hierarchy levels.
const TASK_FRAMING: &str = "You are a document-intake assistant for an organization's scanned mail. \
Read the document text below and classify the document into exactly one of the candidate categories.";

/// Fixed output-format instruction. The three keys are the response parser's
/// contract; keep both sides in sync.
const OUTPUT_INSTRUCTION: &str = r#"Respond with a single JSON object containing exactly these three keys:
{"category": "<name of the chosen category>", "confidence": <number between 0.0 and 1.0>, "reasoning": "<one or two sentences explaining the choice>"}
Do not include any text outside the JSON object."#;

/// Build the categorization prompt for one hierarchy level.
///
/// `parent_name` anchors a level-2 prompt to the already-chosen level-1
/// category and is ignored at level 1. The returned string still contains
/// [`DOCUMENT_PLACEHOLDER`]; substitute it per document with
/// [`substitute_document`].
pub fn build_prompt(categories: &[Category], level: u8, parent_name: Option<&str>) -> String {
    let mut prompt = String::new();
    prompt.push_str(TASK_FRAMING);
    prompt.push_str("\n\n");

    if level >= 2
        && let Some(parent) = parent_name
    {
        let _ = writeln!(
            prompt,
            "The document has already been assigned the top-level category \"{parent}\". \
Choose the subcategory of \"{parent}\" that fits best.",
        );
        prompt.push('\n');
    }

    prompt.push_str("Candidate categories:\n");
    for (i, category) in categories.iter().enumerate() {
        let _ = write!(prompt, "{}. {}", i + 1, category.name);
        if !category.description.is_empty() {
            let _ = write!(prompt, " — {}", category.description);
        }
        prompt.push('\n');
        if category.use_keywords && !category.keywords.is_empty() {
            let _ = writeln!(prompt, "   Keywords: {}", category.keywords.join(", "));
        }
    }

    prompt.push('\n');
    prompt.push_str(OUTPUT_INSTRUCTION);
    prompt.push_str("\n\nDocument text:\n");
    prompt.push_str(DOCUMENT_PLACEHOLDER);
    prompt
}

/// Substitute the extracted document text into a built prompt.
pub fn substitute_document(prompt: &str, document_text: &str) -> String {
    prompt.replace(DOCUMENT_PLACEHOLDER, document_text)
}
