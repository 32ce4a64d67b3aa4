pub mod db;

pub use db::{
    clear_scans, count_scans, create_db, latest_scans, save_scan, save_scans, search_scans,
    DbPool, ScanRecord, DEFAULT_LIST_LIMIT,
};
