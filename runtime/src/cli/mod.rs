//! CLI subcommand implementations for the `sitedigest` binary.

pub mod crawl_cmd;
pub mod digest_cmd;
pub mod logging;
pub mod output;
pub mod serve;
