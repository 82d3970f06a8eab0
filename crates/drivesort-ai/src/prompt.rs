//! Classification prompt shared by the cloud and local stages.

use drivesort_core::{ClassificationRequest, Taxonomy};

/// Where the prompt is going. Local models get a trailing `Response:` cue,
/// which small chat models need to start answering instead of continuing the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Cloud,
    Local,
}

pub fn build_prompt(
    taxonomy: &Taxonomy,
    request: &ClassificationRequest,
    style: PromptStyle,
) -> String {
    let mut prompt = format!(
        "Task: Classify text into exactly one category: {categories}.\n\
         Output Format: JSON with keys \"category\" and \"confidence\" (integer 0-100).\n\
         Constraint: No chat, no markdown.\n\
         \n\
         File Name: {file_name}\n\
         Input Text:\n\
         {snippet}\n",
        categories = taxonomy.prompt_list(),
        file_name = request.file_name(),
        snippet = request.snippet(),
    );
    if style == PromptStyle::Local {
        prompt.push_str("\nResponse:");
    }
    prompt
}
