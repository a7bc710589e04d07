pub mod order_ctx;
pub mod order_inspection;

pub use order_ctx::OrderCtx;
pub use order_inspection::{InspectionOutcome, OrderInspector};
