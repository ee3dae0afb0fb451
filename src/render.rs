//! Invoice HTML rendering.

use crate::calc::Calculator;
use crate::invoice::Invoice;

/// Template-to-HTML seam consumed by the CLI.
pub trait Renderer {
    fn render(&self, invoice: &Invoice) -> String;
}

/// Minimal self-contained HTML document.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRenderer<C: Calculator> {
    calculator: C,
}

impl<C: Calculator> HtmlRenderer<C> {
    pub fn new(calculator: C) -> Self {
        HtmlRenderer { calculator }
    }
}

impl<C: Calculator> Renderer for HtmlRenderer<C> {
    fn render(&self, invoice: &Invoice) -> String {
        let mut rows = String::new();
        for item in &invoice.line_items {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&item.description),
                item.quantity,
                item.unit_price,
                item.quantity * item.unit_price,
            ));
        }
        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Invoice {number}</title></head>\n<body>\n\
             <h1>Invoice {number}</h1>\n<p>Billed to: {client}</p>\n\
             <table>\n<tr><th>Description</th><th>Qty</th><th>Unit</th><th>Amount</th></tr>\n\
             {rows}</table>\n\
             <p>Subtotal: {subtotal} {currency}</p>\n\
             <p>Tax: {tax} {currency}</p>\n\
             <p><strong>Total: {total} {currency}</strong></p>\n</body>\n</html>\n",
            number = escape(&invoice.number),
            client = escape(&invoice.client),
            rows = rows,
            subtotal = self.calculator.subtotal(invoice),
            tax = self.calculator.tax(invoice),
            total = self.calculator.total(invoice),
            currency = escape(&invoice.currency),
        )
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
