//! Customer receipt renderer
//!
//! Single pass over the snapshot: header, order metadata, item table, totals,
//! pay-request QR and footer. Money is formatted here and never recomputed.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{Outlet, PrintJob, PrintJobKind};
use shared::order::{OrderLine, OrderSnapshot, OrderTotals};
use tiffin_printer::text::{display_width, pad, wrap};
use tiffin_printer::{EncodingError, EscPosBuilder, Rule};

use crate::core::config::non_blank;
use super::format::{
    AmountSign, format_amount_line, format_money, format_timestamp, label_with_percent,
};

// Minimum item table column widths; each numeric cell starts with a one-space
// gap and widens to fit the largest value in the order
const QTY_WIDTH: usize = 4;
const RATE_WIDTH: usize = 8;
const AMOUNT_WIDTH: usize = 9;
const MIN_NAME_WIDTH: usize = 8;

/// Item table layout for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    name: usize,
    qty: usize,
    rate: usize,
    amount: usize,
    /// Numbers go on their own row below the name
    stacked: bool,
}

impl Columns {
    fn fit(width: usize, items: &[OrderLine]) -> Self {
        let widest = |min: usize, header: &str, values: Vec<String>| {
            values
                .iter()
                .map(|v| display_width(v))
                .chain([display_width(header)])
                .map(|w| w + 1)
                .fold(min, usize::max)
        };
        let qty = widest(
            QTY_WIDTH,
            "Qty",
            items.iter().map(|i| i.quantity.to_string()).collect(),
        );
        let rate = widest(
            RATE_WIDTH,
            "Rate",
            items.iter().map(|i| format_money(i.unit_price)).collect(),
        );
        let amount = widest(
            AMOUNT_WIDTH,
            "Amount",
            items.iter().map(|i| format_money(i.line_total)).collect(),
        );

        let name = width.saturating_sub(qty + rate + amount);
        let stacked = name < MIN_NAME_WIDTH;
        Self {
            name: if stacked { width.max(1) } else { name },
            qty,
            rate,
            amount,
            stacked,
        }
    }

    fn numbers(&self, qty: &str, rate: &str, amount: &str) -> String {
        format!(
            "{}{}{}",
            cell(qty, self.qty),
            cell(rate, self.rate),
            cell(amount, self.amount)
        )
    }
}

fn right_align(value: &str, width: usize) -> String {
    let indent = width.saturating_sub(display_width(value));
    format!("{}{}", " ".repeat(indent), value)
}

// Column widths always leave room for the value; numbers are never cut
fn cell(value: &str, width: usize) -> String {
    let gap = width.saturating_sub(display_width(value)).max(1);
    format!("{}{}", " ".repeat(gap), value)
}

/// UPI pay-request URI for the receipt QR
///
/// ```
/// # use rust_decimal::Decimal;
/// let amount = Decimal::new(23625, 2);
/// let uri = tiffin_pos::printing::upi_pay_uri("tiffin@upi", "Tiffin House", amount);
/// assert_eq!(uri, "upi://pay?pa=tiffin%40upi&pn=Tiffin%20House&am=236.25&cu=INR");
/// ```
pub fn upi_pay_uri(merchant_id: &str, payee_name: &str, amount: Decimal) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("pa", merchant_id)
        .append_pair("pn", payee_name)
        .append_pair("am", &format_money(amount))
        .append_pair("cu", "INR")
        .finish();
    // Form encoding writes spaces as '+'; UPI apps expect %20
    format!("upi://pay?{}", query.replace('+', "%20"))
}

/// Receipt renderer
///
/// Common widths:
/// - 58mm paper: 32 characters
/// - 80mm paper: 48 characters
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    outlet: Outlet,
}

impl ReceiptRenderer {
    pub fn new(width: usize, timezone: Tz, outlet: Outlet) -> Self {
        Self {
            width,
            timezone,
            outlet,
        }
    }

    /// Render a receipt
    ///
    /// Fails only when the pay-request URI does not fit in a QR code.
    pub fn render(&self, order: &OrderSnapshot) -> Result<PrintJob, EncodingError> {
        let mut b = EscPosBuilder::new(self.width);

        self.render_header(&mut b);
        self.render_metadata(&mut b, order);
        self.render_items(&mut b, &order.items);
        self.render_totals(&mut b, &order.totals);
        self.render_footer(&mut b, &order.totals)?;

        Ok(PrintJob::new(PrintJobKind::Receipt, b.build()))
    }

    fn render_header(&self, b: &mut EscPosBuilder) {
        b.center();
        b.double_height();
        b.bold();
        for row in wrap(&self.outlet.name, self.width) {
            b.line(&row);
        }
        b.bold_off();
        b.reset_size();

        if !self.outlet.address.trim().is_empty() {
            for row in wrap(&self.outlet.address, self.width) {
                b.line(&row);
            }
        }
        if let Some(phone) = non_blank(self.outlet.phone.clone()) {
            b.line(&format!("Ph: {phone}"));
        }

        b.left();
        b.rule(Rule::Dashed);
    }

    fn render_metadata(&self, b: &mut EscPosBuilder, order: &OrderSnapshot) {
        b.line_lr(
            &format!("Bill No: {}", order.order_number),
            &format_timestamp(order.created_at, self.timezone),
        );
        b.line(&order.label());

        let customer = &order.customer;
        if let Some(name) = non_blank(customer.name.clone()) {
            b.line(&format!("Customer: {name}"));
        }
        if let Some(mobile) = non_blank(customer.mobile.clone()) {
            b.line(&format!("Mobile: {mobile}"));
        }
        if let Some(address) = non_blank(customer.address.clone()) {
            for row in wrap(&format!("Address: {address}"), self.width) {
                b.line(&row);
            }
        }
        if let Some(method) = non_blank(order.payment_method.clone()) {
            b.line(&format!("Payment: {method}"));
        }

        b.rule(Rule::Dashed);
    }

    fn render_items(&self, b: &mut EscPosBuilder, items: &[OrderLine]) {
        let columns = Columns::fit(self.width, items);

        b.bold();
        let header = columns.numbers("Qty", "Rate", "Amount");
        self.item_row(b, &columns, vec!["Item".to_string()], &header);
        b.bold_off();
        b.rule(Rule::Dotted);

        for item in items {
            let mut name = item.name.clone();
            if let Some(portion) = item.portion {
                name.push_str(&format!(" ({})", portion.label()));
            }

            let numbers = columns.numbers(
                &item.quantity.to_string(),
                &format_money(item.unit_price),
                &format_money(item.line_total),
            );
            self.item_row(b, &columns, wrap(&name, columns.name), &numbers);
        }

        b.rule(Rule::Dotted);
    }

    fn item_row(
        &self,
        b: &mut EscPosBuilder,
        columns: &Columns,
        name_rows: Vec<String>,
        numbers: &str,
    ) {
        if columns.stacked {
            for row in &name_rows {
                b.line(row);
            }
            b.line(&right_align(numbers, self.width));
            return;
        }

        let mut rows = name_rows.into_iter();
        let first = rows.next().unwrap_or_default();
        b.line(&format!("{}{}", pad(&first, columns.name, false), numbers));
        // Continuation rows carry the name only
        for row in rows {
            b.line(&row);
        }
    }

    /// Money rows above the grand total, in print order
    fn total_rows(&self, t: &OrderTotals) -> Vec<String> {
        let row = |label: &str, amount: Decimal, sign: AmountSign| {
            format_amount_line(label, amount, sign, self.width)
        };
        let mut rows = vec![row("Subtotal", t.subtotal, AmountSign::Positive)];

        if !t.discount.is_zero() {
            rows.push(row(
                &label_with_percent("Discount", t.discount_percent),
                t.discount,
                AmountSign::Negative,
            ));
        }
        if !t.special_discount.is_zero() {
            rows.push(row("Special Discount", t.special_discount, AmountSign::Negative));
        }
        if !t.extra_charges.is_zero() {
            rows.push(row("Extra Charges", t.extra_charges, AmountSign::Positive));
        }
        if [t.discount, t.special_discount, t.extra_charges]
            .iter()
            .any(|a| !a.is_zero())
        {
            rows.push(row("Net Subtotal", t.discounted_subtotal, AmountSign::Positive));
        }
        if !t.service_charge.is_zero() {
            rows.push(row(
                &label_with_percent("Service Charge", t.service_charge_percent),
                t.service_charge,
                AmountSign::Positive,
            ));
        }
        rows.push(row(
            &label_with_percent("Tax", t.tax_percent),
            t.tax,
            AmountSign::Positive,
        ));
        if !t.tip.is_zero() {
            rows.push(row("Tip", t.tip, AmountSign::Positive));
        }

        rows
    }

    fn render_totals(&self, b: &mut EscPosBuilder, totals: &OrderTotals) {
        for row in self.total_rows(totals) {
            b.line(&row);
        }

        b.rule(Rule::Double);
        b.bold();
        b.double_height();
        b.line(&format_amount_line(
            "TOTAL",
            totals.grand_total,
            AmountSign::Positive,
            self.width,
        ));
        b.reset_size();
        b.bold_off();
        b.rule(Rule::Double);
    }

    fn render_footer(
        &self,
        b: &mut EscPosBuilder,
        totals: &OrderTotals,
    ) -> Result<(), EncodingError> {
        b.center();

        if let Some(merchant_id) = self.outlet.merchant_id() {
            b.bold();
            b.line("Scan & pay with any UPI app");
            b.bold_off();
            b.line("GPay / PhonePe / Paytm / BHIM");
            b.qr_code(&upi_pay_uri(merchant_id, &self.outlet.name, totals.grand_total))?;
            b.newline();
        }

        b.line("Thank you! Visit again");
        b.reset_style();
        b.feed(3);
        b.cut();
        Ok(())
    }
}
