//! Formatting helpers shared by the renderers

use chrono_tz::Tz;
use rust_decimal::Decimal;
use tiffin_printer::text::{display_width, pad, truncate};

/// Whether an amount adds to or is taken off the bill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    Positive,
    Negative,
}

/// Format a timestamp (Unix millis) in the outlet's timezone
pub fn format_timestamp(ts_millis: i64, tz: Tz) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

/// Two decimal places, no currency symbol
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Percentage without trailing zeros ("5", "2.5")
pub fn format_percent(percent: Decimal) -> String {
    percent.normalize().to_string()
}

/// `"Tax"` or `"Tax (5%)"` when a percentage is known
pub fn label_with_percent(label: &str, percent: Decimal) -> String {
    if percent.is_zero() {
        label.to_string()
    } else {
        format!("{label} ({}%)", format_percent(percent))
    }
}

/// One money row: label on the left, signed amount flush right
///
/// The label is truncated so the amount is never pushed off the line.
pub fn format_amount_line(label: &str, amount: Decimal, sign: AmountSign, width: usize) -> String {
    let value = match sign {
        AmountSign::Positive => format_money(amount),
        AmountSign::Negative => format!("-{}", format_money(amount.abs())),
    };

    let label_cells = width.saturating_sub(display_width(&value));
    let label = truncate(label, label_cells.saturating_sub(1));
    format!("{}{}", pad(&label, label_cells, false), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_timestamp() {
        // 2024-03-15 12:00:00 UTC
        let ts = 1_710_504_000_000;
        assert_eq!(format_timestamp(ts, chrono_tz::Asia::Kolkata), "15/03/2024 17:30");
        assert_eq!(format_timestamp(ts, chrono_tz::UTC), "15/03/2024 12:00");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(250)), "250.00");
        assert_eq!(format_money(dec!(12.5)), "12.50");
        assert_eq!(format_money(dec!(9.999)), "10.00");
    }

    #[test]
    fn test_label_with_percent() {
        assert_eq!(label_with_percent("Tax", dec!(5.00)), "Tax (5%)");
        assert_eq!(label_with_percent("Tax", dec!(2.50)), "Tax (2.5%)");
        assert_eq!(label_with_percent("Tax", Decimal::ZERO), "Tax");
    }

    #[test]
    fn test_format_amount_line() {
        let line = format_amount_line("Subtotal", dec!(250), AmountSign::Positive, 32);
        assert_eq!(line.len(), 32);
        assert!(line.starts_with("Subtotal "));
        assert!(line.ends_with("250.00"));

        let line = format_amount_line("Discount (10%)", dec!(25), AmountSign::Negative, 32);
        assert!(line.ends_with(" -25.00"));
    }

    #[test]
    fn test_amount_line_keeps_amount_visible() {
        let line = format_amount_line(
            "A very long label that will not fit",
            dec!(1234.5),
            AmountSign::Positive,
            20,
        );
        assert_eq!(display_width(&line), 20);
        assert!(line.ends_with(" 1234.50"));
    }
}
