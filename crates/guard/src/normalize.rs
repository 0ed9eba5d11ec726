/// Lower-case, map punctuation (except apostrophes) to spaces, and collapse
/// whitespace. Typographic apostrophes become `'`.
///
/// Guards match against this form; the caller's text is never changed.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\'' | '\u{2019}' | '\u{2018}' => '\'',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect::<String>()
        .to_lowercase();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
