use super::lot::LotId;
use chrono::NaiveDate;

/// Fatal conditions that abort matching for the current asset.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MatchError {
    #[error(
        "record {id} ({description:?}) is malformed: {reason}. \
         Only include Buy and Sell rows; remove dividends, transaction fees, FX credit/debit etc."
    )]
    MalformedRecord {
        id: String,
        description: String,
        reason: String,
    },
    #[error(
        "acquisition on {buy_date} (IDs {buy_ids}) does not follow disposal on {sell_date} (IDs {sell_ids}). \
         Buy or sell transactions may be missing from the input, or belong to another tax year"
    )]
    AcquisitionNotFollowingDisposal {
        buy_ids: String,
        sell_ids: String,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    },
    #[error("lot {id} missing from outstanding {list} lots")]
    MissingLot { id: LotId, list: &'static str },
}
