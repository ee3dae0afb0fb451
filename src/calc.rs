//! Invoice amount calculation.

use rust_decimal::Decimal;

use crate::invoice::Invoice;

/// Subtotal/tax/total math over an invoice's line items.
pub trait Calculator {
    fn subtotal(&self, invoice: &Invoice) -> Decimal;
    fn tax(&self, invoice: &Invoice) -> Decimal;
    fn total(&self, invoice: &Invoice) -> Decimal;
}

/// Plain quantity-times-unit-price calculation with a flat tax rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCalculator;

impl Calculator for StandardCalculator {
    fn subtotal(&self, invoice: &Invoice) -> Decimal {
        invoice
            .line_items
            .iter()
            .map(|item| item.quantity * item.unit_price)
            .sum()
    }

    fn tax(&self, invoice: &Invoice) -> Decimal {
        self.subtotal(invoice) * invoice.tax_rate
    }

    fn total(&self, invoice: &Invoice) -> Decimal {
        self.subtotal(invoice) + self.tax(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::LineItem;
    use std::str::FromStr;

    #[test]
    fn totals_line_items_with_tax() {
        let mut invoice = Invoice::sample("INV-001");
        invoice.line_items = vec![
            LineItem {
                description: "Design".to_string(),
                quantity: Decimal::from(8),
                unit_price: Decimal::from_str("95.50").expect("decimal"),
            },
            LineItem {
                description: "Development".to_string(),
                quantity: Decimal::from(20),
                unit_price: Decimal::from(120),
            },
        ];
        invoice.tax_rate = Decimal::from_str("0.19").expect("decimal");

        let calc = StandardCalculator;
        assert_eq!(
            calc.subtotal(&invoice),
            Decimal::from_str("3164.00").expect("decimal")
        );
        assert_eq!(
            calc.tax(&invoice),
            Decimal::from_str("601.1600").expect("decimal")
        );
        assert_eq!(
            calc.total(&invoice),
            Decimal::from_str("3765.1600").expect("decimal")
        );
    }

    #[test]
    fn empty_invoice_totals_zero() {
        let mut invoice = Invoice::sample("INV-001");
        invoice.line_items.clear();
        let calc = StandardCalculator;
        assert_eq!(calc.total(&invoice), Decimal::ZERO);
    }
}
