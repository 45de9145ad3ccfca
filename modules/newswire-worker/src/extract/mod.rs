pub mod content;
pub mod date;
pub mod html;
pub mod links;

pub use content::extract_content;
pub use links::collect_links;
