// ── Width formatting ──
//
// Render-ready rows are plain strings padded (or cut) to a fixed column
// width measured in chars.

/// Fit `text` into exactly `width` chars, padding with `fill`.
pub fn fit(text: &str, width: usize, fill: char) -> String {
    let mut out: String = text.chars().take(width).collect();
    let used = out.chars().count();
    out.extend(std::iter::repeat_n(fill, width - used));
    out
}

/// Fit every field of a row to `width`.
pub fn fit_row(fields: &[String], width: usize) -> Vec<String> {
    fields.iter().map(|f| fit(f, width, ' ')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_text_with_fill() {
        assert_eq!(fit("Value", 8, '.'), "Value...");
    }

    #[test]
    fn truncates_long_text() {
        assert_eq!(fit("BrowseName", 6, ' '), "Browse");
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(fit("°C", 4, ' '), "°C  ");
    }

    #[test]
    fn zero_width_is_empty() {
        assert_eq!(fit("anything", 0, ' '), "");
    }
}
