pub mod money;
pub mod order;

pub use money::{Money, CURRENCY_PREFIX};
pub use order::{
    FinalReport, OrderEntry, PriceRow, ResultStatus, SessionResults, WorkItem, WorkResult,
    WorkState, WorkStatus,
};
