use super::error::MatchError;
use super::state::{MatchingRule, OutstandingState};

/// Close short positions: match each outstanding sell with the buys that follow it.
///
/// Buys are taken first-in-first-out. Each pairing is checked before anything
/// is mutated, so a buy that does not postdate its sell fails the run with the
/// state exactly as the previous pairing left it.
pub fn match_acquisitions_following_disposal(state: &mut OutstandingState) -> Result<(), MatchError> {
    let sells = state.sells.clone();

    for sell in sells {
        while state.is_outstanding_sell(sell) {
            let Some(&buy) = state.buys.first() else {
                break;
            };

            let (buy_lot, sell_lot) = (state.lot(buy), state.lot(sell));
            if buy_lot.date <= sell_lot.date {
                log::error!(
                    "Processing halted at buy {} and sell {}",
                    buy_lot.ids_display(),
                    sell_lot.ids_display()
                );
                return Err(MatchError::AcquisitionNotFollowingDisposal {
                    buy_ids: buy_lot.ids_display(),
                    sell_ids: sell_lot.ids_display(),
                    buy_date: buy_lot.date,
                    sell_date: sell_lot.date,
                });
            }

            state.match_pair(buy, sell, MatchingRule::AcquisitionFollowingDisposal)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lot::{Direction, Lot};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn acq(date: &str, qty: u64, total: Decimal) -> Lot {
        Lot::new(format!("buy-{date}"), date.parse::<NaiveDate>().unwrap(), Direction::Buy, qty, total)
    }

    fn disp(date: &str, qty: u64, total: Decimal) -> Lot {
        Lot::new(format!("sell-{date}"), date.parse::<NaiveDate>().unwrap(), Direction::Sell, qty, total)
    }

    #[test]
    fn short_closed_by_later_buy() {
        let mut state = OutstandingState::new(
            vec![acq("2023-09-01", 10, dec!(90.00))],
            vec![disp("2023-06-01", 10, dec!(100.00))],
        );

        match_acquisitions_following_disposal(&mut state).unwrap();

        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events[0].rule, MatchingRule::AcquisitionFollowingDisposal);
        assert_eq!(state.events[0].profit_or_loss, dec!(10.00));
        assert!(state.buys.is_empty() && state.sells.is_empty());
    }

    #[test]
    fn short_closed_by_several_buys_in_order() {
        let mut state = OutstandingState::new(
            vec![acq("2023-09-01", 4, dec!(40.00)), acq("2023-10-01", 10, dec!(120.00))],
            vec![disp("2023-06-01", 10, dec!(110.00))],
        );

        match_acquisitions_following_disposal(&mut state).unwrap();

        assert_eq!(state.events.len(), 2);
        assert_eq!(state.events[0].quantity, 4);
        assert_eq!(state.events[0].profit_or_loss, dec!(4.00));
        assert_eq!(state.events[1].quantity, 6);
        assert_eq!(state.events[1].cost, dec!(72.00));
        assert_eq!(state.events[1].profit_or_loss, dec!(-6.00));

        let left = state.lot(state.buys[0]);
        assert_eq!(left.quantity, 4);
        assert_eq!(left.total_price, dec!(48.00));
        assert!(state.sells.is_empty());
    }

    #[test]
    fn earlier_buy_fails_without_mutating() {
        let mut state = OutstandingState::new(
            vec![acq("2023-05-01", 10, dec!(90.00))],
            vec![disp("2023-06-01", 10, dec!(100.00))],
        );

        let err = match_acquisitions_following_disposal(&mut state).unwrap_err();

        assert_eq!(
            err,
            MatchError::AcquisitionNotFollowingDisposal {
                buy_ids: "buy-2023-05-01".to_string(),
                sell_ids: "sell-2023-06-01".to_string(),
                buy_date: "2023-05-01".parse().unwrap(),
                sell_date: "2023-06-01".parse().unwrap(),
            }
        );
        assert!(state.events.is_empty());
        assert_eq!(state.lot(state.buys[0]).quantity, 10);
        assert_eq!(state.lot(state.sells[0]).quantity, 10);
    }

    #[test]
    fn same_date_buy_is_rejected() {
        let mut state = OutstandingState::new(
            vec![acq("2023-06-01", 1, dec!(9.00))],
            vec![disp("2023-06-01", 1, dec!(10.00))],
        );

        assert!(matches!(
            match_acquisitions_following_disposal(&mut state),
            Err(MatchError::AcquisitionNotFollowingDisposal { .. })
        ));
    }

    #[test]
    fn sell_left_outstanding_when_buys_run_out() {
        let mut state = OutstandingState::new(
            vec![acq("2023-09-01", 3, dec!(30.00))],
            vec![disp("2023-06-01", 10, dec!(100.00))],
        );

        match_acquisitions_following_disposal(&mut state).unwrap();

        assert!(state.buys.is_empty());
        let left = state.lot(state.sells[0]);
        assert_eq!(left.quantity, 7);
        assert_eq!(left.total_price, dec!(70.00));
    }
}
