pub mod ai_generate;
pub mod domain_verify;
pub mod scrape;
pub mod source_sync;
