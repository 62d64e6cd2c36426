pub mod backup;
pub mod history;
pub mod logging;
pub mod retention;
