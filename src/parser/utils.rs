//! Label escaping for writing Newick and NEXUS output.

/// Characters that force a label into single quotes
const SPECIAL_CHARS: &[char] = &[',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\'', '='];

/// Checks if a label can be written as is: either it is wrapped in single
/// quotes with every inner quote doubled, or it contains neither spaces nor
/// special characters.
///
/// # Examples
/// ```
/// # use treeannotator::parser::utils::is_escaped;
/// assert!(is_escaped("Kakapo"));
/// assert!(is_escaped("Strigops_habroptila"));
/// assert!(is_escaped("'Strigops habroptila'"));
/// assert!(is_escaped("'Haast''s_eagle'"));
/// assert!(!is_escaped("Haast's eagle"));
/// assert!(!is_escaped("'Haast's eagle'"));
/// assert!(!is_escaped("Ka[ka]po"));
/// ```
pub fn is_escaped(label: &str) -> bool {
    if !is_single_quoted(label) {
        return !label.chars().any(|c| c == ' ' || SPECIAL_CHARS.contains(&c));
    }

    let inner = &label[1..label.len() - 1];
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' && chars.next() != Some('\'') {
            return false;
        }
    }
    true
}

/// Checks if a label is enclosed in single quotes.
///
/// # Examples
/// ```
/// # use treeannotator::parser::utils::is_single_quoted;
/// assert!(!is_single_quoted("Kea"));
/// assert!(is_single_quoted("'Nestor notabilis'"));
/// assert!(!is_single_quoted("'"));
/// ```
pub fn is_single_quoted(label: &str) -> bool {
    label.len() >= 2 && label.starts_with('\'') && label.ends_with('\'')
}

/// Escapes a label for Newick and NEXUS output.
///
/// Labels with special characters are wrapped in single quotes with inner
/// quotes doubled; labels with spaces only get underscores. Already escaped
/// labels are returned unchanged.
///
/// # Examples
/// ```
/// # use treeannotator::parser::utils::escape_label;
/// assert_eq!(escape_label("Kakapo"), "Kakapo");
/// assert_eq!(escape_label("Strigops habroptila"), "Strigops_habroptila");
/// assert_eq!(escape_label("Ka[ka]po"), "'Ka[ka]po'");
/// assert_eq!(escape_label("Haast's eagle"), "'Haast''s eagle'");
/// assert_eq!(escape_label("'Haast''s eagle'"), "'Haast''s eagle'");
/// ```
pub fn escape_label(label: &str) -> String {
    if is_escaped(label) {
        return label.to_string();
    }

    if is_single_quoted(label) {
        let inner = &label[1..label.len() - 1];
        return format!("'{}'", double_lone_quotes(inner));
    }

    if label.chars().any(|c| SPECIAL_CHARS.contains(&c)) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.replace(' ', "_")
    }
}

/// Doubles every single quote not already doubled.
fn double_lone_quotes(inner: &str) -> String {
    let mut fixed = String::with_capacity(inner.len() + 2);
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        fixed.push(c);
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            fixed.push('\'');
        }
    }
    fixed
}
