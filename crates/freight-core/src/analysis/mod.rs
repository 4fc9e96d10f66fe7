pub mod migration_plan;
pub mod shared_dirs;

pub use migration_plan::{MigrationMode, MigrationOutcome, MigrationPlan, MigrationRun};
pub use shared_dirs::{SharedDirReport, SharedDirSettings, SharedDirectory};
