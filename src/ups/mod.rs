pub mod paths;
pub mod scraper;
pub mod session;
pub mod types;

pub use scraper::DeviceScraper;
pub use session::{Credentials, Session, Token};
