use chrono::Utc;
use mercato_catalog::ReservedLine;
use mercato_core::{Money, Principal};
use uuid::Uuid;

use crate::models::{Order, OrderLine, OrderStatus};

/// Assembles the finalized order from reserved lines and the aggregate
/// discount.
///
/// Each line's discount share is `discount * line_subtotal / subtotal`
/// rounded half-up to the cent (zero across the board when the subtotal is
/// zero). Because the shares round independently, their sum can drift from
/// the aggregate discount by up to one cent per line; `grand_total` is
/// computed directly as `subtotal - discount` and is the reconciled figure
/// downstream accounting must trust. The drift is left on the lines rather
/// than forced onto the last one.
pub fn finalize(
    principal: &Principal,
    reserved: Vec<ReservedLine>,
    subtotal: Money,
    discount: Money,
    coupon_code: Option<String>,
) -> Order {
    let order_id = Uuid::new_v4();
    let now = Utc::now();

    let lines = reserved
        .into_iter()
        .map(|line| {
            let line_subtotal = line.line_subtotal();
            let discount_share = discount.pro_rata(line_subtotal, subtotal);
            OrderLine {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_share,
                line_total: line_subtotal - discount_share,
            }
        })
        .collect();

    Order {
        id: order_id,
        owner_id: principal.user_id,
        owner_name: principal.username.clone(),
        lines,
        subtotal,
        discount,
        grand_total: subtotal - discount,
        coupon_code,
        status: OrderStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_core::CustomerTier;

    fn principal() -> Principal {
        Principal::new(Uuid::new_v4(), "alice", CustomerTier::Standard)
    }

    fn reserved(price_minor: i64, quantity: i64) -> ReservedLine {
        ReservedLine {
            product_id: Uuid::new_v4(),
            product_name: "item".to_string(),
            quantity,
            unit_price: Money::from_minor(price_minor),
        }
    }

    #[test]
    fn shares_are_proportional_and_totals_reconcile() {
        let lines = vec![reserved(10_000, 4), reserved(20_000, 1)]; // 400 + 200
        let subtotal = Money::from_major(600);
        let discount = Money::from_major(90);

        let order = finalize(&principal(), lines, subtotal, discount, None);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.grand_total, Money::from_major(510));
        assert_eq!(order.lines[0].discount_share, Money::from_major(60));
        assert_eq!(order.lines[1].discount_share, Money::from_major(30));
        assert_eq!(order.lines[0].line_total, Money::from_major(340));
        assert_eq!(order.lines[1].line_total, Money::from_major(170));
    }

    #[test]
    fn zero_subtotal_allocates_nothing() {
        let lines = vec![reserved(0, 3)];
        let order = finalize(&principal(), lines, Money::ZERO, Money::ZERO, None);
        assert_eq!(order.grand_total, Money::ZERO);
        assert_eq!(order.lines[0].discount_share, Money::ZERO);
        assert_eq!(order.lines[0].line_total, Money::ZERO);
    }

    #[test]
    fn share_drift_stays_within_a_cent_per_line() {
        // Three equal lines and a discount that does not divide evenly.
        let lines = vec![reserved(3_333, 1), reserved(3_333, 1), reserved(3_334, 1)];
        let subtotal = Money::from_minor(10_000);
        let discount = Money::from_minor(1_000);

        let order = finalize(&principal(), lines, subtotal, discount, None);

        let share_sum: Money = order.lines.iter().map(|l| l.discount_share).sum();
        let drift = (share_sum.minor() - discount.minor()).abs();
        assert!(drift <= order.lines.len() as i64);

        // Grand total stays the direct subtraction regardless of drift.
        assert_eq!(order.grand_total, Money::from_minor(9_000));
    }

    #[test]
    fn no_share_exceeds_its_line_subtotal() {
        let lines = vec![reserved(1, 1), reserved(99_999, 1)];
        let subtotal = Money::from_minor(100_000);
        let discount = Money::from_minor(100_000); // 100% off

        let order = finalize(&principal(), lines, subtotal, discount, None);

        for line in &order.lines {
            assert!(line.discount_share <= line.line_subtotal());
            assert!(line.line_total >= Money::ZERO);
        }
    }

    #[test]
    fn owner_and_coupon_are_snapshot_on_the_order() {
        let who = principal();
        let order = finalize(
            &who,
            vec![reserved(500, 2)],
            Money::from_minor(1_000),
            Money::ZERO,
            Some("SPRING".to_string()),
        );
        assert_eq!(order.owner_id, who.user_id);
        assert_eq!(order.owner_name, "alice");
        assert_eq!(order.coupon_code.as_deref(), Some("SPRING"));
    }
}
