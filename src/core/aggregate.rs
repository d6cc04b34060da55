use super::error::MatchError;
use super::lot::{Direction, Lot};
use super::record::RawRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Merge same-day, same-direction records into one lot per day.
///
/// Returns `(buys, sells)`, each ascending by date. Any record that is not a buy
/// or sell fails the whole asset.
pub fn aggregate(records: &[RawRecord]) -> Result<(Vec<Lot>, Vec<Lot>), MatchError> {
    let mut buys: BTreeMap<NaiveDate, Lot> = BTreeMap::new();
    let mut sells: BTreeMap<NaiveDate, Lot> = BTreeMap::new();

    for record in records {
        let direction = record.direction()?;
        let quantity = record.quantity()?;
        let total_price = record.total_price(direction);

        let day = match direction {
            Direction::Buy => &mut buys,
            Direction::Sell => &mut sells,
        };

        match day.get_mut(&record.date) {
            Some(lot) => {
                let overflow = || MatchError::MalformedRecord {
                    id: record.id.clone(),
                    description: record.description.clone(),
                    reason: format!("{} total for {} overflows", direction, record.date),
                };
                lot.quantity = lot.quantity.checked_add(quantity).ok_or_else(overflow)?;
                lot.total_price = lot.total_price.checked_add(total_price).ok_or_else(overflow)?;
                lot.ids.push(record.id.clone());
                log::debug!(
                    "Merged {} {} into {} lot on {}: qty={}, total={}",
                    record.id,
                    quantity,
                    direction,
                    record.date,
                    lot.quantity,
                    lot.total_price
                );
            }
            None => {
                day.insert(
                    record.date,
                    Lot::new(record.id.clone(), record.date, direction, quantity, total_price),
                );
            }
        }
    }

    log::debug!(
        "Aggregated {} records into {} buy and {} sell lots",
        records.len(),
        buys.len(),
        sells.len()
    );

    Ok((buys.into_values().collect(), sells.into_values().collect()))
}
