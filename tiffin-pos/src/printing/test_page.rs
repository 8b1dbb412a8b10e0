//! Printer self-test page, printed right after connecting

use chrono_tz::Tz;
use shared::models::{PrintJob, PrintJobKind};
use tiffin_printer::{EscPosBuilder, PrinterDevice, Rule};

use super::format::format_timestamp;

pub struct TestPageRenderer {
    width: usize,
    timezone: Tz,
    outlet_name: String,
}

impl TestPageRenderer {
    pub fn new(width: usize, timezone: Tz, outlet_name: impl Into<String>) -> Self {
        Self {
            width,
            timezone,
            outlet_name: outlet_name.into(),
        }
    }

    pub fn render(&self, printer: &PrinterDevice, now_millis: i64) -> PrintJob {
        let mut b = EscPosBuilder::new(self.width);

        b.center();
        b.double_size();
        b.bold();
        b.line("TEST PRINT");
        b.reset_style();

        b.center();
        b.line(&self.outlet_name);
        b.line(&format_timestamp(now_millis, self.timezone));
        b.left();
        b.rule(Rule::Dashed);

        b.line_lr("Printer", &printer.name);
        b.line_lr("Id", printer.id.as_str());
        b.line_lr("Paper width", &self.width.to_string());
        b.rule(Rule::Dashed);

        // Alignment and style samples
        b.line("Left");
        b.center().line("Center");
        b.right().line("Right");
        b.left();
        b.bold().line("Bold").bold_off();
        b.double_height().line("Double height").reset_size();

        // Column ruler: the last digit must sit on the right edge
        let ruler: String = (1..=self.width)
            .map(|i| char::from(b'0' + (i % 10) as u8))
            .collect();
        b.line(&ruler);
        b.rule(Rule::Double);

        b.center();
        b.line("Printer OK");
        b.left();
        b.feed(3);
        b.cut();

        PrintJob::new(PrintJobKind::Test, b.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::fixtures::{CREATED_AT, contains};

    #[test]
    fn test_page_content() {
        let printer = PrinterDevice::discovered("AA:BB".into(), "MTP-II".to_string());
        let renderer = TestPageRenderer::new(32, chrono_tz::Asia::Kolkata, "Tiffin House");

        let job = renderer.render(&printer, CREATED_AT);
        let bytes = job.payload();

        assert_eq!(job.kind(), PrintJobKind::Test);
        assert!(contains(bytes, "TEST PRINT\n"));
        assert!(contains(bytes, "Tiffin House\n"));
        assert!(contains(bytes, "15/03/2024 17:30\n"));
        assert!(contains(bytes, "MTP-II\n"));
        assert!(contains(bytes, "AA:BB\n"));
        assert!(contains(bytes, "12345678901234567890123456789012\n"));
        assert!(bytes.ends_with(&[0x1D, 0x56, 0x00]));
    }
}
