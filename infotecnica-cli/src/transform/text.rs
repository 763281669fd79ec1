//! Label cleanup for substation terminals and bay names

/// Structural prefixes Infotécnica puts in front of section terminal labels
const TERMINAL_PREFIXES: &[&str] = &["Tap: ", "Paño: ", "Paño : ", "Tap : ", "Punto: "];

/// Terminal kinds that never carry a current transformer
const TERMINAL_EXCLUSIONS: &[&str] = &["TAP", "EST"];

/// Remove the first matching structural prefix, only when the label starts with it
pub fn strip_prefix_label(text: &str) -> &str {
    TERMINAL_PREFIXES
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .unwrap_or(text)
}

/// Drop everything after the first `/` of the last whitespace token.
///
/// `"S/E CHARRUA J5/J6"` becomes `"S/E CHARRUA J5"`. Whitespace runs collapse
/// to single spaces.
pub fn truncate_last_token(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    if let Some(last) = tokens.last_mut() {
        if let Some((head, _)) = last.split_once('/') {
            *last = head;
        }
    }
    tokens.join(" ")
}

/// Prefix removal followed by last-token truncation
pub fn clean_terminal(text: &str) -> String {
    truncate_last_token(strip_prefix_label(text))
}

/// Map accented uppercase vowels to their plain letter. `Ñ` is preserved.
pub fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            other => other,
        })
        .collect()
}

/// Bays created for new sections are labelled `PA S/E ...`; normalise to `S/E ...`
pub fn replace_bay_prefix(text: &str) -> String {
    text.replace("PA S/E", "S/E")
}

/// True for terminals that are taps or structures
pub fn is_excluded_terminal(text: &str) -> bool {
    TERMINAL_EXCLUSIONS.iter().any(|p| text.starts_with(p))
}

/// Split `"S/E ALTO JAHUEL J1"` into substation `"ALTO JAHUEL"` and bay `"J1"`.
///
/// The bay is the last token; the substation is everything between the first
/// and last tokens.
pub fn split_terminal(text: &str) -> (Option<String>, Option<String>) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let bay = tokens.last().map(|s| s.to_string());
    let substation = if tokens.len() > 2 {
        Some(tokens[1..tokens.len() - 1].join(" "))
    } else if tokens.is_empty() {
        None
    } else {
        Some(String::new())
    };
    (substation, bay)
}
