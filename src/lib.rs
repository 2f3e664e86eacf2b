pub mod detector;
pub mod domain;
pub mod history;
pub mod indicators;
pub mod locator;
pub mod output;
