use rust_decimal::Decimal;

/// Integer cents to currency units (two decimal places)
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
