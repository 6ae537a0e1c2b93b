//! CLI subcommands.

pub mod report;

pub use report::ReportArgs;
