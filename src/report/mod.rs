pub mod generator;
pub mod summary;

pub use generator::{generate_report, render_summary};
pub use summary::{build_summary, TetherSummary};
