//! ESC/POS command encoding
//!
//! Free functions map one directive to its exact byte sequence. They are
//! deterministic and allocation-light; [`EscPosBuilder`] composes them into a
//! ticket with a fluent API.
//!
//! Text is passed through as UTF-8. Printers that need a legacy code page are
//! out of scope.

use crate::error::EncodingError;
use crate::text::display_width;

/// QR module size used when none is given (dots per module)
pub const QR_MODULE_SIZE: u8 = 6;

/// Largest QR payload: the store frame's `pL` byte holds `len + 3`
pub const QR_MAX_PAYLOAD: usize = 255 - 3;

/// Horizontal alignment (`ESC a n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    fn byte(self) -> u8 {
        match self {
            Alignment::Left => 0x00,
            Alignment::Center => 0x01,
            Alignment::Right => 0x02,
        }
    }
}

/// Character scale (`GS ! n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontScale {
    #[default]
    Normal,
    DoubleHeight,
    DoubleWidthHeight,
}

impl FontScale {
    fn byte(self) -> u8 {
        match self {
            FontScale::Normal => 0x00,
            FontScale::DoubleHeight => 0x01,
            FontScale::DoubleWidthHeight => 0x11,
        }
    }
}

/// Horizontal rule style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Dotted,
    Dashed,
    Double,
}

impl Rule {
    fn fill(self) -> char {
        match self {
            Rule::Dotted => '.',
            Rule::Dashed => '-',
            Rule::Double => '=',
        }
    }
}

/// ESC @ - reset printer state
pub fn initialize() -> [u8; 2] {
    [0x1B, 0x40]
}

/// ESC a n
pub fn set_alignment(alignment: Alignment) -> [u8; 3] {
    [0x1B, 0x61, alignment.byte()]
}

/// ESC E n
pub fn set_emphasis(on: bool) -> [u8; 3] {
    [0x1B, 0x45, u8::from(on)]
}

/// GS ! n
pub fn set_font_scale(scale: FontScale) -> [u8; 3] {
    [0x1D, 0x21, scale.byte()]
}

/// UTF-8 passthrough
pub fn text(s: &str) -> &[u8] {
    s.as_bytes()
}

/// ESC d n - print and feed n lines
pub fn feed(lines: u8) -> [u8; 3] {
    [0x1B, 0x64, lines]
}

/// GS V 0 - full cut
pub fn cut_paper() -> [u8; 3] {
    [0x1D, 0x56, 0x00]
}

/// QR code with the default module size
pub fn qr_code(data: &str) -> Result<Vec<u8>, EncodingError> {
    qr_code_sized(data, QR_MODULE_SIZE)
}

/// QR code as five `GS ( k` frames: model 2, module size, error
/// correction M, store, print
pub fn qr_code_sized(data: &str, module_size: u8) -> Result<Vec<u8>, EncodingError> {
    let payload = data.as_bytes();
    if payload.len() > QR_MAX_PAYLOAD {
        return Err(EncodingError::PayloadTooLong {
            len: payload.len(),
            max: QR_MAX_PAYLOAD,
        });
    }
    let p_l = (payload.len() + 3) as u8;

    let mut buf = Vec::with_capacity(payload.len() + 41);
    // Function 165: model 2
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);
    // Function 167: module size
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, module_size]);
    // Function 169: error correction M
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]);
    // Function 180: store data
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, p_l, 0x00, 0x31, 0x50, 0x30]);
    buf.extend_from_slice(payload);
    // Function 181: print
    buf.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
    Ok(buf)
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(2048);
        buf.extend_from_slice(&initialize());
        Self { buf, width }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(text(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&feed(lines));
        self
    }

    // === Alignment ===

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        self.buf.extend_from_slice(&set_alignment(alignment));
        self
    }

    pub fn center(&mut self) -> &mut Self {
        self.align(Alignment::Center)
    }

    pub fn left(&mut self) -> &mut Self {
        self.align(Alignment::Left)
    }

    pub fn right(&mut self) -> &mut Self {
        self.align(Alignment::Right)
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&set_emphasis(true));
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&set_emphasis(false));
        self
    }

    pub fn scale(&mut self, scale: FontScale) -> &mut Self {
        self.buf.extend_from_slice(&set_font_scale(scale));
        self
    }

    pub fn double_height(&mut self) -> &mut Self {
        self.scale(FontScale::DoubleHeight)
    }

    pub fn double_size(&mut self) -> &mut Self {
        self.scale(FontScale::DoubleWidthHeight)
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.scale(FontScale::Normal)
    }

    /// Left alignment, emphasis off, normal scale
    ///
    /// Printers keep modes across lines, so every styled section ends with this.
    pub fn reset_style(&mut self) -> &mut Self {
        self.left().bold_off().reset_size()
    }

    // === Separators ===

    /// Print a full-width rule
    pub fn rule(&mut self, rule: Rule) -> &mut Self {
        let line: String = std::iter::repeat_n(rule.fill(), self.width).collect();
        self.line(&line)
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = display_width(left);
        let rw = display_width(right);

        if lw + rw >= self.width {
            // Too long, just print with space
            self.text(left);
            self.text(" ");
            self.line(right);
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right);
        }
        self
    }

    // === QR Code ===

    /// Print a QR code with the default module size
    pub fn qr_code(&mut self, data: &str) -> Result<&mut Self, EncodingError> {
        let frames = qr_code(data)?;
        self.buf.extend_from_slice(&frames);
        Ok(self)
    }

    // === Paper Control ===

    /// Full cut
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&cut_paper());
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_bytes() {
        assert_eq!(initialize(), [0x1B, 0x40]);
        assert_eq!(set_alignment(Alignment::Left), [0x1B, 0x61, 0x00]);
        assert_eq!(set_alignment(Alignment::Center), [0x1B, 0x61, 0x01]);
        assert_eq!(set_alignment(Alignment::Right), [0x1B, 0x61, 0x02]);
        assert_eq!(set_emphasis(true), [0x1B, 0x45, 0x01]);
        assert_eq!(set_emphasis(false), [0x1B, 0x45, 0x00]);
        assert_eq!(set_font_scale(FontScale::Normal), [0x1D, 0x21, 0x00]);
        assert_eq!(set_font_scale(FontScale::DoubleHeight), [0x1D, 0x21, 0x01]);
        assert_eq!(
            set_font_scale(FontScale::DoubleWidthHeight),
            [0x1D, 0x21, 0x11]
        );
        assert_eq!(feed(3), [0x1B, 0x64, 0x03]);
        assert_eq!(cut_paper(), [0x1D, 0x56, 0x00]);
    }

    #[test]
    fn test_text_is_utf8_passthrough() {
        assert_eq!(text("₹ 50"), "₹ 50".as_bytes());
    }

    #[test]
    fn test_qr_frames() {
        let data = "upi://pay?pa=x";
        let bytes = qr_code(data).unwrap();

        let mut expected = vec![
            0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00, // model 2
            0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 0x06, // module size 6
            0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31, // error correction M
        ];
        expected.extend_from_slice(&[0x1D, 0x28, 0x6B, 17, 0x00, 0x31, 0x50, 0x30]);
        expected.extend_from_slice(data.as_bytes());
        expected.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_qr_is_deterministic() {
        let data = "upi://pay?pa=a@b&am=10.00";
        assert_eq!(qr_code(data).unwrap(), qr_code(data).unwrap());
    }

    #[test]
    fn test_qr_length_boundary() {
        let max = "a".repeat(QR_MAX_PAYLOAD);
        let bytes = qr_code(&max).unwrap();
        // pL of the store frame
        assert_eq!(bytes[28], 0xFF);

        let over = "a".repeat(QR_MAX_PAYLOAD + 1);
        assert_eq!(
            qr_code(&over),
            Err(EncodingError::PayloadTooLong { len: 253, max: 252 })
        );
    }

    #[test]
    fn test_builder_starts_with_initialize() {
        let mut b = EscPosBuilder::new(32);
        b.center().double_height().line("KOT").reset_style();

        let data = b.build();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        assert!(data.ends_with(&[0x1B, 0x61, 0x00, 0x1B, 0x45, 0x00, 0x1D, 0x21, 0x00]));
    }

    #[test]
    fn test_line_lr() {
        let mut b = EscPosBuilder::new(20);
        b.line_lr("Subtotal", "120.00");

        let data = b.build();
        let s = String::from_utf8_lossy(&data[2..]);
        assert_eq!(s, "Subtotal      120.00\n");
    }

    #[test]
    fn test_rule() {
        let mut b = EscPosBuilder::new(10);
        b.rule(Rule::Dotted).rule(Rule::Double);

        let data = b.build();
        let s = String::from_utf8_lossy(&data[2..]);
        assert_eq!(s, "..........\n==========\n");
    }

    #[test]
    fn test_builder_qr_error_leaves_buffer_untouched() {
        let mut b = EscPosBuilder::new(32);
        assert!(b.qr_code(&"x".repeat(300)).is_err());
        assert_eq!(b.build(), vec![0x1B, 0x40]);
    }
}
