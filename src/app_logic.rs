/*
 * This module provides the application logic layer, centered around
 * `AppLogic`, which coordinates the core engine on behalf of the command-line
 * front end. Unit tests for `AppLogic` are in `handler_tests.rs`.
 */
pub mod handler;


pub use handler::{AppError, AppLogic};
