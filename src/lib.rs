pub mod config;
pub mod errors;
pub mod handoff;
pub mod init;
pub mod lookup;
pub mod model;
pub mod pr_size;
pub mod scan;
pub mod scheduler;
pub mod tracker;
