pub mod order_discovery;
pub mod page_waits;
pub mod price_extraction;
pub mod tax_validation;
pub mod work_records;

pub use order_discovery::{discover, Discovery};
pub use price_extraction::{find_labeled_value, parse_money, sum_discounts, try_parse_money};
pub use tax_validation::{TaxAssessment, GST_RATE};
