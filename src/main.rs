//! OpenAPI Model Generator - Command-line tool for generating OpenAPI documents.
//!
//! This binary provides a command-line interface for generating OpenAPI 3.0
//! documents from a declarative API model file. The model describes entities,
//! serializers and endpoints; the tool resolves them into a complete OpenAPI
//! document with named, reusable schema components.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-model [OPTIONS] <MODEL_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-model ./api-model.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON documentation:
//! ```bash
//! openapi-from-model ./api-model.yaml -f json -o openapi.json
//! ```
//!
//! Validate the assembled document:
//! ```bash
//! openapi-from-model ./api-model.yaml --validate
//! ```

mod cli;
mod error;
mod field_walker;
mod model;
mod openapi_builder;
mod overrides;
mod polymorphic;
mod render;
mod schema_generator;
mod type_resolver;
mod validation;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // We need to parse args twice: once to get verbose flag, then again after logger init
    // First, do a quick parse just to check for verbose flag
    let args_for_verbose = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI Model Generator starting...");

    // Now do the full parse with validation
    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    // Run the main workflow
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
