//! Column layout helpers for fixed-width thermal paper
//!
//! Thermal printers lay text out in a fixed grid of character cells. Most
//! characters take one cell; East Asian wide characters take two. Widths here
//! are in cells, never bytes, since text is sent as UTF-8.

use unicode_width::UnicodeWidthChar;

/// Cell width of a single character
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Cell width of a string
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Truncate a string to fit within a cell width
pub fn truncate(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string to a specific cell width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad(s: &str, width: usize, align_right: bool) -> String {
    let current_width = display_width(s);
    if current_width >= width {
        return truncate(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Word-wrap a string into rows of at most `width` cells
///
/// Words longer than a row are split. Always returns at least one row.
pub fn wrap(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;

    for word in s.split_whitespace() {
        let word_width = display_width(word);

        if row_width > 0 && row_width + 1 + word_width <= width {
            row.push(' ');
            row.push_str(word);
            row_width += 1 + word_width;
            continue;
        }

        if row_width > 0 {
            rows.push(std::mem::take(&mut row));
            row_width = 0;
        }

        if word_width <= width {
            row.push_str(word);
            row_width = word_width;
            continue;
        }

        // Hard split
        for c in word.chars() {
            let w = char_width(c);
            if row_width > 0 && row_width + w > width {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(c);
            row_width += w;
        }
    }

    if row_width > 0 || rows.is_empty() {
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width() {
        assert_eq!(display_width("Paneer Tikka"), 12);
        assert_eq!(display_width("₹ 120.00"), 8);
        assert_eq!(display_width("宫保鸡丁"), 8);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_control_and_combining_chars_take_no_cells() {
        assert_eq!(char_width('\n'), 0);
        assert_eq!(char_width('\u{0301}'), 0);
        assert_eq!(display_width("Cafe\u{0301}"), 4);
    }

    #[test]
    fn test_truncate_never_splits_wide_char() {
        assert_eq!(truncate("宫保鸡丁", 5), "宫保");
        assert_eq!(truncate("Masala Dosa", 6), "Masala");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("Qty", 5, false), "Qty  ");
        assert_eq!(pad("2", 4, true), "   2");
        assert_eq!(pad("Butter Naan", 6, false), "Butter");
    }

    #[test]
    fn test_wrap_words() {
        let rows = wrap("Chicken Biryani Family Pack", 12);
        assert_eq!(rows, vec!["Chicken", "Biryani", "Family Pack"]);
    }

    #[test]
    fn test_wrap_hard_splits_long_word() {
        let rows = wrap("Supercalifragilistic", 8);
        assert_eq!(rows, vec!["Supercal", "ifragili", "stic"]);
        assert!(rows.iter().all(|r| display_width(r) <= 8));
    }

    #[test]
    fn test_wrap_empty_yields_one_row() {
        assert_eq!(wrap("", 10), vec![String::new()]);
        assert_eq!(wrap("   ", 10), vec![String::new()]);
    }
}
