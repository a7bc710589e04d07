pub mod connection;
pub mod tab_launcher;

pub use connection::connect_to_browser_and_page;
pub use tab_launcher::TabLauncher;
