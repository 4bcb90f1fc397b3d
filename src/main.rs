#![allow(non_snake_case)]
use log::{info, warn};
use riemann_explorer::Utils::config::AppConfig;
use riemann_explorer::Utils::function_catalog::FunctionCatalog;
use riemann_explorer::Utils::logger::init_logger;
use riemann_explorer::Utils::report::{ComparisonRow, comparison_table};
use riemann_explorer::numerical::riemann_engine::RiemannEngine;
use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
use std::process::ExitCode;

/// usage: riemann_explorer [config.toml] [expression ...]
fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match AppConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}: {}", path, err);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    if let Err(err) = init_logger(&config.logging) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let compiler = ExpressionCompiler::from_config(&config);
    let mut catalog = FunctionCatalog::with_compiler(compiler.clone());
    catalog.load_from_json(&config.catalog.path);
    for source in args {
        if let Err(err) = catalog.add(&source) {
            warn!("{}", err);
        }
    }
    if catalog.is_empty() && config.catalog.seed_defaults {
        catalog.seed_defaults();
    }
    if let Err(err) = catalog.save_to_json(&config.catalog.path) {
        warn!("catalog not saved: {}", err);
    }

    let mut engine = RiemannEngine::from_config(&config);
    let mut rows = Vec::new();
    for (source, compiled) in catalog.compile_all(&compiler) {
        match compiled {
            Ok(expression) => {
                engine.set_function(expression);
                let outcome = engine.compute();
                rows.push(ComparisonRow::from_engine(&engine, &outcome));
            }
            Err(err) => warn!("{}: {}", source, err),
        }
    }
    info!("computed {} of {} functions", rows.len(), catalog.len());
    println!("{}", comparison_table(&rows));
    ExitCode::SUCCESS
}
