pub mod batch;
pub mod capability;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod ocr;
pub mod pdf;
pub mod report;
pub mod result;
pub mod stats;
pub mod task;
pub mod text;
pub mod util;
