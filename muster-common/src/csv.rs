//! CSV export formatting
//!
//! Header names are written as given. Field values have `"` doubled and are
//! wrapped in quotes when they contain a comma, quote, or newline. Lines are
//! joined with `\n`, without a trailing newline.

use std::borrow::Cow;

/// Escape one field value
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.contains(&[',', '"', '\n'][..]) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
}

/// Render a header line followed by one line per row
pub fn to_csv<I, R, F>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<str>,
{
    let mut lines = vec![headers.join(",")];
    for row in rows {
        let fields: Vec<String> = row
            .into_iter()
            .map(|field| escape_field(field.as_ref()).into_owned())
            .collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}
