use crate::prompt::Response;

/// Markers found in any answer, in marker-set order, each listed once.
pub fn matched_markers<'m>(responses: &[Response], markers: &'m [String]) -> Vec<&'m str> {
    let answers: Vec<String> = responses.iter().map(|r| r.answer.to_lowercase()).collect();

    markers
        .iter()
        .filter(|m| !m.is_empty())
        .filter(|m| {
            let needle = m.to_lowercase();
            answers.iter().any(|a| a.contains(&needle))
        })
        .map(|m| m.as_str())
        .collect()
}

/// True if any answer contains any marker (case-insensitive substring).
#[inline]
pub fn signal_present(responses: &[Response], markers: &[String]) -> bool {
    !matched_markers(responses, markers).is_empty()
}
