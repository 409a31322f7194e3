pub mod config;
pub mod crawl;
pub mod report;
pub mod status;

pub use crawl::run_crawl;
pub use report::show_report;
pub use status::show_status;
