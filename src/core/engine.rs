use super::acquisition_following_disposal::match_acquisitions_following_disposal;
use super::aggregate::aggregate;
use super::bed_and_breakfast::match_bed_and_breakfast;
use super::error::MatchError;
use super::lot::Lot;
use super::record::RawRecord;
use super::same_day::match_same_day;
use super::section104::{match_section104, PoolHistoryEntry, Section104Holding, Section104Outcome};
use super::state::{Ledger, MatchEvent, OutstandingState};
use super::uk::TaxYear;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// Realised totals, each rounded to pence. Losses are negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Totals {
    #[schemars(with = "String")]
    pub gains: Decimal,
    #[schemars(with = "String")]
    pub losses: Decimal,
    #[schemars(with = "String")]
    pub net: Decimal,
}

impl From<&Ledger> for Totals {
    fn from(ledger: &Ledger) -> Self {
        Totals {
            gains: ledger.gains(),
            losses: ledger.losses(),
            net: ledger.net(),
        }
    }
}

/// Outcome of matching one asset's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct MatchReport {
    pub events: Vec<MatchEvent>,
    pub pool_history: Vec<PoolHistoryEntry>,
    /// Residual Section 104 holding, reported but not persisted
    pub carry_forward: Option<Section104Holding>,
    pub outstanding_buys: Vec<Lot>,
    pub outstanding_sells: Vec<Lot>,
    pub totals: Totals,
}

impl MatchReport {
    fn new(state: OutstandingState, section104: Section104Outcome) -> Self {
        let outstanding_buys = state.outstanding_buys();
        let outstanding_sells = state.outstanding_sells();

        for lot in outstanding_buys.iter().chain(&outstanding_sells) {
            log::warn!("Unmatched {}", lot);
        }

        MatchReport {
            totals: Totals::from(&state.ledger),
            events: state.events,
            pool_history: section104.history,
            carry_forward: section104.carry_forward,
            outstanding_buys,
            outstanding_sells,
        }
    }

    /// Lots no rule could match, which need human judgement
    pub fn has_outstanding(&self) -> bool {
        !self.outstanding_buys.is_empty() || !self.outstanding_sells.is_empty()
    }

    pub fn events_in(&self, year: Option<TaxYear>) -> impl Iterator<Item = &MatchEvent> {
        self.events
            .iter()
            .filter(move |e| year.map_or(true, |y| e.tax_year == y))
    }

    /// Totals for one tax year, or the whole run when `year` is None
    pub fn totals_for(&self, year: Option<TaxYear>) -> Totals {
        if year.is_none() {
            return self.totals;
        }
        let mut ledger = Ledger::default();
        for event in self.events_in(year) {
            ledger.record(event.profit_or_loss);
        }
        Totals::from(&ledger)
    }

    /// Tax years with at least one disposal, ascending
    pub fn tax_years(&self) -> Vec<TaxYear> {
        let mut years: Vec<TaxYear> = self.events.iter().map(|e| e.tax_year).collect();
        years.sort();
        years.dedup();
        years
    }
}

/// Match one asset's raw statement records under the HMRC share-matching rules.
pub fn match_records(records: &[RawRecord]) -> Result<MatchReport, MatchError> {
    let (buys, sells) = aggregate(records)?;
    match_lots(buys, sells)
}

/// Run the matchers in priority order over already aggregated lots.
pub fn match_lots(buys: Vec<Lot>, sells: Vec<Lot>) -> Result<MatchReport, MatchError> {
    let mut state = OutstandingState::new(buys, sells);

    match_same_day(&mut state)?;
    match_bed_and_breakfast(&mut state)?;
    let section104 = match_section104(&mut state)?;
    match_acquisitions_following_disposal(&mut state)?;

    Ok(MatchReport::new(state, section104))
}
