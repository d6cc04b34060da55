use super::error::MatchError;
use super::state::{MatchingRule, OutstandingState};

/// Match each sell against the buy dated the same day.
///
/// After aggregation there is at most one buy lot per date, so each sell is
/// matched at most once here.
pub fn match_same_day(state: &mut OutstandingState) -> Result<(), MatchError> {
    let sells = state.sells.clone();

    for sell in sells {
        let date = state.lot(sell).date;
        let Some(buy) = state.buys.iter().copied().find(|b| state.lot(*b).date == date) else {
            continue;
        };
        state.match_pair(buy, sell, MatchingRule::SameDay)?;
    }

    Ok(())
}
