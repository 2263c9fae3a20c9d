/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Cut a model response down to the outermost JSON object.
///
/// Models without native structured output tend to wrap the object in code
/// fences or a sentence of prose. Returns the stripped input unchanged when
/// no `{...}` span is present.
pub fn extract_json_object(response: &str) -> &str {
    let stripped = strip_code_blocks(response);
    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => &stripped[start..=end],
        _ => stripped,
    }
}
