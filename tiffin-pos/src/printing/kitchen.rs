//! Kitchen order ticket (KOT) renderer
//!
//! A first ticket lists every line at full quantity. Once a ticket has been
//! printed for an order, later tickets are "ADDITIONAL KOT"s carrying only the
//! quantity increases (see [`super::diff`]).

use chrono_tz::Tz;
use shared::models::{PrintJob, PrintJobKind};
use shared::order::{OrderSnapshot, PreviousOrderSnapshot};
use tiffin_printer::text::wrap;
use tiffin_printer::{EscPosBuilder, Rule};

use super::diff::{KotLine, kot_lines, total_items};
use super::format::format_timestamp;

const INDENT: &str = "   ";

/// Rendered kitchen ticket
#[derive(Debug)]
pub struct KitchenTicket {
    pub job: PrintJob,
    /// Lines that were printed
    pub lines: Vec<KotLine>,
    /// Sum of printed quantities
    pub total_items: u32,
    /// Rendered against a previous snapshot
    pub additional: bool,
}

impl KitchenTicket {
    /// Nothing new for the kitchen
    pub fn is_duplicate(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Kitchen ticket renderer
pub struct KitchenTicketRenderer {
    width: usize,
    timezone: Tz,
}

impl KitchenTicketRenderer {
    /// Create a new renderer with specified paper width and timezone
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self { width, timezone }
    }

    pub fn render(
        &self,
        order: &OrderSnapshot,
        previous: Option<&PreviousOrderSnapshot>,
    ) -> KitchenTicket {
        let additional = previous.is_some();
        let lines = kot_lines(order, previous);
        let total_items = total_items(&lines);

        let mut b = EscPosBuilder::new(self.width);
        self.render_header(&mut b, order, additional);

        if lines.is_empty() {
            self.render_placeholder(&mut b);
        } else {
            for line in &lines {
                self.render_item(&mut b, line);
            }
        }

        self.render_footer(&mut b, total_items);

        KitchenTicket {
            job: PrintJob::new(PrintJobKind::Kot, b.build()),
            lines,
            total_items,
            additional,
        }
    }

    fn render_header(&self, b: &mut EscPosBuilder, order: &OrderSnapshot, additional: bool) {
        b.center();
        b.double_height();
        b.bold();
        b.line(if additional { "ADDITIONAL KOT" } else { "KOT" });
        b.reset_style();

        b.line_lr(
            &format!("Order #{}", order.order_number),
            &format_timestamp(order.created_at, self.timezone),
        );
        b.bold();
        b.line(&order.label());
        b.bold_off();
        b.rule(Rule::Dashed);
    }

    /// `2 x Masala Dosa (Half)`, continuation rows indented under the name
    fn render_item(&self, b: &mut EscPosBuilder, line: &KotLine) {
        let mut name = line.name.clone();
        if let Some(portion) = line.portion {
            name.push_str(&format!(" ({})", portion.label()));
        }

        let qty = format!("{} x ", line.quantity);
        let hang = " ".repeat(qty.len());
        let rows = wrap(&name, self.width.saturating_sub(qty.len()));

        b.bold();
        for (i, row) in rows.iter().enumerate() {
            let lead = if i == 0 { qty.as_str() } else { hang.as_str() };
            b.line(&format!("{lead}{row}"));
        }
        b.bold_off();

        if let Some(note) = &line.instructions {
            let note = match line.annotation() {
                Some(annotation) => format!("* {note} {annotation}"),
                None => format!("* {note}"),
            };
            for row in wrap(&note, self.width.saturating_sub(INDENT.len())) {
                b.line(&format!("{INDENT}{row}"));
            }
        }
    }

    fn render_placeholder(&self, b: &mut EscPosBuilder) {
        b.center();
        b.line("No new items added");
        b.line("(Duplicate ticket)");
        b.left();
    }

    fn render_footer(&self, b: &mut EscPosBuilder, total_items: u32) {
        b.rule(Rule::Dashed);
        b.bold();
        b.line(&format!("Total Items: {total_items}"));
        b.bold_off();

        b.feed(3);
        b.cut();
    }
}

impl Default for KitchenTicketRenderer {
    fn default() -> Self {
        Self::new(32, chrono_tz::Asia::Kolkata)
    }
}
