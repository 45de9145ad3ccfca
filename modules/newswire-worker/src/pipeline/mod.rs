pub mod article;
pub mod batch;
pub mod multi_source;
pub mod source;

pub use article::run_article_job;
pub use batch::run_batch_job;
pub use multi_source::run_multi_source_job;
pub use source::run_source_job;
