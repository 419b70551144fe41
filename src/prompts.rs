//! Prompts sent to the text and vision models.
//!
//! The structuring prompt is generated from the [`NoteSchema`] so the sections
//! the model is asked for are always the sections the strict rebuilder looks
//! for. The prompt ends with the title marker to prime the answer.

use crate::config::NoteSchema;

/// Transcription prompt for the vision model.
pub const OCR_PROMPT: &str = "You are a precise OCR assistant.\n\
Transcribe ALL visible text exactly as written.\n\
- Preserve line breaks, punctuation, and formatting.\n\
- Do NOT add explanations, headers, or commentary.\n\
- Output ONLY the raw text.";

/// Prompt for the strict strategy: fixed title and section headers.
pub fn strict_prompt(schema: &NoteSchema, raw_text: &str) -> String {
    let mut headers = String::new();
    for section in &schema.sections {
        headers.push_str("  ");
        headers.push_str(&schema.header_for(section));
        headers.push('\n');
    }

    format!(
        "You are a markdown-only assistant that creates project plans.\n\
Follow these rules:\n\
- Start with \"{title}\"\n\
- Include exactly these sections in order:\n\
{headers}\
- Put every item under a section as a \"- \" bullet\n\
- Output ONLY the raw markdown, no explanations, no commentary\n\
- Do NOT wrap the output in ```markdown or any code block\n\
- Do NOT include triple backticks (```)\n\
- If information is missing, make reasonable assumptions\n\
\n\
Raw notes:\n\
{raw_text}\n\
\n\
Now write the plan:\n\
{title}\n",
        title = schema.title_marker,
    )
}

/// Prompt for the permissive strategy: free layout, closing action items.
pub fn permissive_prompt(raw_text: &str) -> String {
    format!(
        "Rewrite the following raw notes as clean, well-organised markdown.\n\
- Use headings and bullet points.\n\
- Keep every fact from the notes; do not invent details.\n\
- Finish with a \"## Next Steps\" section listing concrete action items.\n\
- Output ONLY the markdown, without code fences or commentary.\n\
\n\
Raw notes:\n\
{raw_text}\n"
    )
}
