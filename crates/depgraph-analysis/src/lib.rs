//! File-change categorization and test-impact analysis layered on top of the
//! artifact graph: turning a set of changed paths into a verdict about which
//! test suites need to run.

pub mod category;
pub mod impact;
pub mod test_config;

pub use category::{classify, FileCategory};
pub use impact::{compute_test_selection, env_bool, find_affected_nodes, ImpactInputs};
pub use test_config::TestConfig;
