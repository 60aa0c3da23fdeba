pub mod catalog;
pub mod files;
pub mod settings;
pub mod state;
pub mod store;

pub use catalog::Catalog;
pub use files::{ensure_tether_dir, init_local_tether, report_file, settings_file};
pub use settings::{load_settings, save_settings, AppSettings};
pub use state::{
    append_summary, history_for_date, load_active_session, load_history, save_active_session,
};
pub use store::{JsonDirStore, KeyValueStore};
