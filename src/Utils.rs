//! different utility modules used throughout the project
/// TOML configuration: engine defaults, probe domain, integrator, catalog, logging
pub mod config;
/// saved functions list, JSON backed
pub mod function_catalog;
/// console and file logging with simplelog
pub mod logger;
/// pretty-printing of Riemann vs exact comparisons
pub mod report;
