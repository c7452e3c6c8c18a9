/// Currency utility functions for amounts crossing the payment-processor
/// boundary.
///
/// Contract and milestone amounts are stored in major units (dollars); the
/// processor API speaks minor units (cents). Fee math is done on whole cents
/// to avoid floating-point drift.

/// Convert dollars to cents (multiply by 100)
pub fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

/// Convert cents to dollars (divide by 100)
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Platform fee on a release, in cents. Rounds half up on whole cents.
pub fn platform_fee_cents(amount_cents: i64, fee_percent: i64) -> i64 {
    (amount_cents * fee_percent + 50) / 100
}

/// The freelancer's payout for a release: amount minus the platform fee.
/// `freelancer_payout_cents(a, p) + platform_fee_cents(a, p) == a` for all
/// non-negative amounts.
pub fn freelancer_payout_cents(amount_cents: i64, fee_percent: i64) -> i64 {
    amount_cents - platform_fee_cents(amount_cents, fee_percent)
}

/// Validate and parse an amount string to cents
pub fn parse_amount_to_cents(amount_str: &str) -> Result<i64, String> {
    amount_str
        .parse::<f64>()
        .map_err(|_| "Invalid amount format".to_string())
        .and_then(|amount| {
            if amount < 0.0 {
                Err("Amount cannot be negative".to_string())
            } else {
                Ok(dollars_to_cents(amount))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollars_to_cents() {
        assert_eq!(dollars_to_cents(100.0), 10000);
        assert_eq!(dollars_to_cents(0.50), 50);
        assert_eq!(dollars_to_cents(123.45), 12345);
    }

    #[test]
    fn test_cents_to_dollars() {
        assert_eq!(cents_to_dollars(10000), 100.0);
        assert_eq!(cents_to_dollars(50), 0.50);
        assert_eq!(cents_to_dollars(12345), 123.45);
    }

    #[test]
    fn test_platform_fee_cents() {
        // 10% of $1000.00
        assert_eq!(platform_fee_cents(100_000, 10), 10_000);
        // rounds half up: 10% of $0.05 = 0.5c -> 1c
        assert_eq!(platform_fee_cents(5, 10), 1);
        assert_eq!(platform_fee_cents(0, 10), 0);
    }

    #[test]
    fn test_payout_plus_fee_equals_amount() {
        for amount in [0i64, 1, 5, 99, 100, 12345, 100_000, 999_999] {
            let fee = platform_fee_cents(amount, 10);
            let payout = freelancer_payout_cents(amount, 10);
            assert_eq!(payout + fee, amount, "split must be exact for {}", amount);
        }
    }

    #[test]
    fn test_milestone_release_split() {
        // milestone of $1000 at 10%: freelancer receives $900, platform keeps $100
        let amount = dollars_to_cents(1000.0);
        assert_eq!(freelancer_payout_cents(amount, 10), 90_000);
        assert_eq!(platform_fee_cents(amount, 10), 10_000);
    }

    #[test]
    fn test_parse_amount_to_cents() {
        assert_eq!(parse_amount_to_cents("100.00"), Ok(10000));
        assert_eq!(parse_amount_to_cents("0.50"), Ok(50));
        assert_eq!(parse_amount_to_cents("-100"), Err("Amount cannot be negative".to_string()));
        assert_eq!(parse_amount_to_cents("abc"), Err("Invalid amount format".to_string()));
    }
}
