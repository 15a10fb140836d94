//! Per-partner aggregation.

use rust_decimal::{Decimal, RoundingStrategy};
use stl_schemas::amount::round_2dp;
use stl_schemas::{PartnerStats, PaymentRecord, PaymentStatus};

/// Success rate as a percentage with one decimal place, half-up.
/// Zero transactions is a rate of 0.
pub fn success_rate(successful: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(successful) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// `acc + amount`, pinned at `Decimal::MAX` instead of overflowing.
fn add_saturating(acc: Decimal, amount: Decimal, partner: &str) -> Decimal {
    acc.checked_add(amount).unwrap_or_else(|| {
        tracing::warn!(partner, %amount, "partner total exceeds decimal range; clamped");
        Decimal::MAX
    })
}

/// Aggregate the payments labelled `partner`. Sums that leave the decimal
/// range are clamped to `Decimal::MAX`.
pub fn partner_stats(partner: &str, payments: &[PaymentRecord]) -> PartnerStats {
    let mut total: u64 = 0;
    let mut successful: u64 = 0;
    let mut total_amount = Decimal::ZERO;
    let mut success_amount = Decimal::ZERO;

    for p in payments.iter().filter(|p| p.partner == partner) {
        total += 1;
        total_amount = add_saturating(total_amount, p.amount, partner);
        if p.status == PaymentStatus::Success {
            successful += 1;
            success_amount = add_saturating(success_amount, p.amount, partner);
        }
    }

    let avg_amount = if successful == 0 {
        Decimal::ZERO
    } else {
        success_amount
            .checked_div(Decimal::from(successful))
            .map_or(Decimal::MAX, round_2dp)
    };

    PartnerStats {
        partner: partner.to_string(),
        total_transactions: total,
        successful_transactions: successful,
        total_amount: round_2dp(total_amount),
        avg_amount,
        success_rate: success_rate(successful, total),
    }
}

/// Stats for `labels` in order, then for any other label found in
/// `payments` in first-seen order.
pub fn aggregate(labels: &[&str], payments: &[PaymentRecord]) -> Vec<PartnerStats> {
    let mut order: Vec<&str> = Vec::with_capacity(labels.len() + 1);
    for l in labels.iter().copied().chain(payments.iter().map(|p| p.partner.as_str())) {
        if !order.contains(&l) {
            order.push(l);
        }
    }
    order
        .into_iter()
        .map(|label| partner_stats(label, payments))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(partner: &str, amount: Decimal, status: PaymentStatus) -> PaymentRecord {
        PaymentRecord {
            id: "id".into(),
            timestamp: "2024-01-01T00:00:00.000Z".into(),
            from: "rA".into(),
            to: "rB".into(),
            amount,
            currency: "XRP".into(),
            status,
            partner: partner.into(),
            tx_hash: "id".into(),
        }
    }

    #[test]
    fn success_rate_rounds_to_one_decimal_half_up() {
        assert_eq!(success_rate(0, 0), Decimal::ZERO);
        assert_eq!(success_rate(1, 3), dec!(33.3));
        assert_eq!(success_rate(2, 3), dec!(66.7));
        assert_eq!(success_rate(1, 8), dec!(12.5));
        assert_eq!(success_rate(1, 16), dec!(6.3));
        assert_eq!(success_rate(5, 5), dec!(100));
    }

    #[test]
    fn average_is_over_successes_only() {
        let payments = vec![
            rec("PG", dec!(10), PaymentStatus::Success),
            rec("PG", dec!(20), PaymentStatus::Success),
            rec("PG", dec!(1000), PaymentStatus::Failed),
            rec("Bank A", dec!(5), PaymentStatus::Success),
        ];
        let s = partner_stats("PG", &payments);
        assert_eq!(s.total_transactions, 3);
        assert_eq!(s.successful_transactions, 2);
        assert_eq!(s.total_amount, dec!(1030));
        assert_eq!(s.avg_amount, dec!(15));
        assert_eq!(s.success_rate, dec!(66.7));
    }

    #[test]
    fn no_successes_means_zero_average() {
        let payments = vec![
            rec("PG", dec!(10), PaymentStatus::Failed),
            rec("PG", dec!(20), PaymentStatus::Pending),
        ];
        let s = partner_stats("PG", &payments);
        assert_eq!(s.avg_amount, Decimal::ZERO);
        assert_eq!(s.success_rate, Decimal::ZERO);
        assert_eq!(s.total_amount, dec!(30));
    }

    #[test]
    fn average_rounds_to_cents() {
        let payments = vec![
            rec("PG", dec!(0.01), PaymentStatus::Success),
            rec("PG", dec!(0.01), PaymentStatus::Success),
            rec("PG", dec!(0.02), PaymentStatus::Success),
        ];
        // 0.04 / 3 = 0.01333..
        assert_eq!(partner_stats("PG", &payments).avg_amount, dec!(0.01));
    }

    #[test]
    fn totals_beyond_decimal_range_clamp_instead_of_panicking() {
        // 5e28: two of these exceed Decimal::MAX (~7.9e28).
        let huge = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        let payments = vec![
            rec("PG", huge, PaymentStatus::Success),
            rec("PG", huge, PaymentStatus::Success),
            rec("PG", dec!(1), PaymentStatus::Failed),
        ];
        let s = partner_stats("PG", &payments);
        assert_eq!(s.total_transactions, 3);
        assert_eq!(s.total_amount, Decimal::MAX);
        assert_eq!(s.avg_amount, round_2dp(Decimal::MAX / dec!(2)));
        assert_eq!(s.success_rate, dec!(66.7));
    }

    #[test]
    fn aggregate_keeps_selection_order_then_extra_labels() {
        let payments = vec![
            rec("Unknown Partner", dec!(1), PaymentStatus::Success),
            rec("PG", dec!(2), PaymentStatus::Success),
        ];
        let stats = aggregate(&["Bank B", "PG"], &payments);
        let labels: Vec<&str> = stats.iter().map(|s| s.partner.as_str()).collect();
        assert_eq!(labels, vec!["Bank B", "PG", "Unknown Partner"]);
        assert_eq!(stats[0].total_transactions, 0);
        assert_eq!(stats[0].total_amount, Decimal::ZERO);
    }
}
