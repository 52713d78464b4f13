pub mod config;
pub mod error;
pub mod json_table;
pub mod library;
pub mod schedule;
pub mod schema;
pub mod stability_store;
pub mod workspace;

pub use config::{CONFIG_FILE, load_config};
pub use error::{Result, StoreError};
pub use json_table::JsonTable;
pub use library::{LibraryStore, LibraryTable};
pub use schedule::{Mutation, MutationContext, ScheduleChange, ScheduleStore};
pub use stability_store::StabilityStore;
pub use workspace::{
    LIBRARY_FILE, MaintenanceReport, MergeReport, SessionLog, SessionReport, Stats, Workspace,
    default_base_dir,
};
