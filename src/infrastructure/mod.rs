pub mod dom;
pub mod file_store;
pub mod js_executor;
pub mod store;

pub use dom::{OrderListing, PageDom, ViewLauncher};
pub use file_store::JsonFileStore;
pub use js_executor::JsExecutor;
pub use store::{MemoryStore, SharedStore};
