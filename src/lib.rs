//! A keypad calculator engine.
//!
//! [`calculator::FormulaEditor`] turns discrete key events into a live,
//! digit-grouped formula and evaluates it on demand. Successful evaluations
//! are recorded through the [`history`] module.

pub mod calculator;
pub mod config;
pub mod history;
