use super::error::MatchError;
use super::lot::LotId;
use super::state::{MatchingRule, OutstandingState};
use chrono::Duration;

/// Days after a disposal in which a reacquisition is matched to it
pub const BED_AND_BREAKFAST_DAYS: i64 = 30;

/// Match each remaining sell against buys in the following 30 days, earliest first.
///
/// A sell can straddle several buys, so it is re-examined after every partial
/// match until it is consumed or nothing in its window is left.
pub fn match_bed_and_breakfast(state: &mut OutstandingState) -> Result<(), MatchError> {
    let sells = state.sells.clone();

    for sell in sells {
        while state.is_outstanding_sell(sell) {
            let Some(buy) = earliest_in_window(state, sell) else {
                break;
            };
            state.match_pair(buy, sell, MatchingRule::BedAndBreakfast)?;
        }
    }

    Ok(())
}

fn earliest_in_window(state: &OutstandingState, sell: LotId) -> Option<LotId> {
    let sell_date = state.lot(sell).date;
    let end = sell_date + Duration::days(BED_AND_BREAKFAST_DAYS + 1);

    state
        .buys
        .iter()
        .copied()
        .filter(|b| {
            let date = state.lot(*b).date;
            date > sell_date && date < end
        })
        .min_by_key(|b| state.lot(*b).date)
}
