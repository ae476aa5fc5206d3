use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// OpenAPI Model Generator - generate OpenAPI 3 documents from a declarative API model
#[derive(Parser, Debug)]
#[command(name = "openapi-from-model")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the API model file (YAML or JSON)
    #[arg(value_name = "MODEL_PATH")]
    pub model_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "file", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Validate the assembled document and exit non-zero on failure
    #[arg(long = "validate")]
    pub validate: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.model_path.exists() {
        anyhow::bail!("Model file does not exist: {}", args.model_path.display());
    }

    if !args.model_path.is_file() {
        anyhow::bail!("Model path is not a file: {}", args.model_path.display());
    }

    info!("Model file: {}", args.model_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::error::Error;
    use crate::model::load_model;
    use crate::openapi_builder::OpenApiBuilder;
    use crate::render::{render_json, render_yaml, write_to_file};
    use crate::schema_generator::SchemaGenerator;
    use crate::validation::validate_document;

    info!("Starting OpenAPI document generation...");

    // Step 1: Load the API model
    info!("Loading API model...");
    let model = load_model(&args.model_path)?;
    info!(
        "Model declares {} entities, {} serializers, {} endpoints",
        model.entities.len(),
        model.serializers.len(),
        model.endpoints.len()
    );

    if model.endpoints.is_empty() {
        log::warn!("Model declares no endpoints; the document will have no paths");
    }

    // Step 2: Initialize the schema generator for this pass
    let mut schema_gen = SchemaGenerator::new(&model);

    // Step 3: Build the OpenAPI document
    info!("Building OpenAPI document...");
    let mut builder = OpenApiBuilder::from_model(&model);
    for endpoint in &model.endpoints {
        debug!(
            "Adding endpoint: {} {}",
            endpoint.method.as_str(),
            endpoint.path
        );
        builder.add_endpoint(endpoint, &mut schema_gen)?;
    }

    let warnings = schema_gen.warnings().to_vec();
    let component_count = schema_gen.components().len();

    let document = builder.build(schema_gen);
    info!("OpenAPI document built successfully");

    // Step 4: Validate if requested; the artifact is written either way
    let validation = if args.validate {
        info!("Validating assembled document...");
        validate_document(&document)
    } else {
        Ok(())
    };

    // Step 5: Render to the requested format
    info!("Rendering to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => render_yaml(&document)?,
        OutputFormat::Json => render_json(&document)?,
    };

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!(
            "Successfully wrote OpenAPI document to {}",
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    // Step 7: Display summary
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Endpoints documented: {}", model.endpoints.len());
    info!("  - Components registered: {}", component_count);
    info!("  - Warnings: {}", warnings.len());

    if let Err(error) = validation {
        if let Error::ValidationError(issues) = &error {
            for issue in issues {
                log::warn!("validation: {}", issue);
            }
        }
        return Err(error.into());
    }

    Ok(())
}
