use rust_decimal::Decimal;

use crate::cart::CartLine;

/// Itemized plain-text receipt: one `{name} x {qty} = {line_total} EUR`
/// line per item, a blank line, then the total. Two decimal places
/// throughout.
pub fn build_receipt_body(lines: &[CartLine], total: Decimal) -> String {
    let items = lines
        .iter()
        .map(|line| {
            format!(
                "{} x {} = {:.2} EUR",
                line.name, line.quantity, line.line_total
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{items}\n\nTotal: {total:.2} EUR")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(name: &str, quantity: u32, unit_price: Decimal) -> CartLine {
        CartLine {
            name: name.to_string(),
            quantity,
            unit_price,
            line_total: Decimal::from(quantity) * unit_price,
        }
    }

    #[test]
    fn body_lists_each_item_then_the_total() {
        let lines = vec![line("apple", 3, dec!(1.50)), line("bread", 1, dec!(1.10))];
        let body = build_receipt_body(&lines, dec!(5.60));

        assert_eq!(body, "apple x 3 = 4.50 EUR\nbread x 1 = 1.10 EUR\n\nTotal: 5.60 EUR");
    }

    #[test]
    fn amounts_always_carry_two_decimals() {
        let lines = vec![line("water", 2, dec!(1))];
        let body = build_receipt_body(&lines, dec!(2));

        assert!(body.contains("water x 2 = 2.00 EUR"));
        assert!(body.ends_with("Total: 2.00 EUR"));
    }

    #[test]
    fn empty_cart_still_renders_a_total() {
        let body = build_receipt_body(&[], Decimal::ZERO);
        assert_eq!(body, "\n\nTotal: 0.00 EUR");
    }
}
