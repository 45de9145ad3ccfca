pub mod config;
pub mod error;
pub mod types;
pub mod urlnorm;

pub use config::Config;
pub use error::NewswireError;
pub use types::*;
pub use urlnorm::{canonicalize_url, is_article_url, is_likely_news_url};
