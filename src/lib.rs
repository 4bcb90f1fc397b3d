// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
//! Evaluates user-typed functions of one variable and compares fixed-partition Riemann
//! sums against exact integrals.
//!
//! - `symbolic`: restricted expression grammar, compiled evaluator, symbolic integration
//! - `numerical`: Riemann sums and the stateful `RiemannEngine`
//! - `Utils`: configuration, logging, saved functions catalog, report tables
pub mod Utils;
pub mod numerical;
pub mod symbolic;
