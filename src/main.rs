//! Leafcam CLI
//!
//! Command-line entry point for plant disease diagnosis with class-activation
//! explanations: classify a leaf image, write a heatmap overlay, or create
//! fresh model and taxonomy artifacts for the server to load.

use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use leafcam::backend::{backend_name, default_device, ServingBackend};
use leafcam::context::ModelContext;
use leafcam::inference::CONFIDENCE_THRESHOLD;
use leafcam::model::{LeafClassifier, LeafClassifierConfig};
use leafcam::overlay::{OverlayFormat, GRADCAM_BLEND, HEATMAP_BLEND};
use leafcam::taxonomy::Taxonomy;
use leafcam::utils::logging::LogConfig;

/// Leafcam: plant disease diagnosis with visual explanations
///
/// Classifies leaf images into PlantVillage-style classes and explains each
/// diagnosis with a gradient-weighted class-activation heatmap.
#[derive(Parser, Debug)]
#[command(name = "leafcam")]
#[command(version)]
#[command(about = "Plant disease diagnosis with Grad-CAM explanations", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single leaf image
    Infer {
        /// Path to the input image
        #[arg(short, long)]
        input: String,

        /// Path to the model weights
        #[arg(short, long, default_value = "models/leafcam.mpk")]
        model: String,

        /// Path to a JSON class list (uses the built-in list when omitted)
        #[arg(short, long)]
        taxonomy: Option<String>,

        /// Probability the winning class must reach for a confident message
        #[arg(long, default_value_t = CONFIDENCE_THRESHOLD)]
        threshold: f32,
    },

    /// Write a class-activation overlay for a single leaf image
    Gradcam {
        /// Path to the input image
        #[arg(short, long)]
        input: String,

        /// Path to the model weights
        #[arg(short, long, default_value = "models/leafcam.mpk")]
        model: String,

        /// Path to a JSON class list (uses the built-in list when omitted)
        #[arg(short, long)]
        taxonomy: Option<String>,

        /// Output image path
        #[arg(short, long, default_value = "gradcam.png")]
        output: String,

        /// Output format: png (image-dominant blend) or jpeg (equal blend)
        #[arg(short, long, default_value = "png")]
        format: String,
    },

    /// Create randomly initialized model and taxonomy artifacts
    InitModel {
        /// Output path for the model weights
        #[arg(short, long, default_value = "models/leafcam.mpk")]
        output: String,

        /// Output path for the class list JSON
        #[arg(long, default_value = "taxonomy/class_names.json")]
        taxonomy_output: String,

        /// Random seed for weight initialization
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// List the classes the model can diagnose
    Classes {
        /// Path to a JSON class list (uses the built-in list when omitted)
        #[arg(short, long)]
        taxonomy: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    log_config.install();

    print_banner();

    match cli.command {
        Commands::Infer {
            input,
            model,
            taxonomy,
            threshold,
        } => {
            cmd_infer(&input, &model, taxonomy.as_deref(), threshold)?;
        }

        Commands::Gradcam {
            input,
            model,
            taxonomy,
            output,
            format,
        } => {
            cmd_gradcam(&input, &model, taxonomy.as_deref(), &output, &format)?;
        }

        Commands::InitModel {
            output,
            taxonomy_output,
            seed,
        } => {
            cmd_init_model(&output, &taxonomy_output, seed)?;
        }

        Commands::Classes { taxonomy } => {
            cmd_classes(taxonomy.as_deref())?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        "🌱 Leafcam: plant disease diagnosis with visual explanations".green()
    );
    println!();
}

/// Load the class list from a file, or fall back to the built-in one
fn load_taxonomy(path: Option<&str>) -> Result<Taxonomy> {
    match path {
        Some(path) => {
            let taxonomy = Taxonomy::from_json_file(path)?;
            info!("Loaded {} classes from {}", taxonomy.len(), path);
            Ok(taxonomy)
        }
        None => Ok(Taxonomy::default_classes()),
    }
}

fn load_context(model: &str, taxonomy: Option<&str>) -> Result<ModelContext<ServingBackend>> {
    let device = default_device();
    let taxonomy = load_taxonomy(taxonomy)?;

    let config = LeafClassifierConfig::new().with_num_classes(taxonomy.len());
    let context = ModelContext::<ServingBackend>::load(&config, model, taxonomy, device)?;
    Ok(context)
}

fn cmd_infer(input: &str, model: &str, taxonomy: Option<&str>, threshold: f32) -> Result<()> {
    println!("{}", "Inference Configuration:".cyan().bold());
    println!("  Input:     {}", input);
    println!("  Model:     {}", model);
    println!("  Threshold: {}", threshold);
    println!("  Backend:   {}", backend_name());
    println!();

    if !Path::new(input).exists() {
        println!("{} Input path not found: {}", "Error:".red(), input);
        return Ok(());
    }
    if !Path::new(model).exists() {
        println!("{} Model path not found: {}", "Error:".red(), model);
        return Ok(());
    }

    println!("{}", "Loading model...".cyan());
    let context = load_context(model, taxonomy)?;

    let bytes = fs::read(input)?;
    let report = context.predict(&bytes, threshold)?;

    println!();
    if report.diagnosis.confident {
        println!("{}", report.display().green());
    } else {
        println!("{}", report.display().yellow());
    }

    Ok(())
}

fn cmd_gradcam(
    input: &str,
    model: &str,
    taxonomy: Option<&str>,
    output: &str,
    format: &str,
) -> Result<()> {
    println!("{}", "Grad-CAM Configuration:".cyan().bold());
    println!("  Input:   {}", input);
    println!("  Model:   {}", model);
    println!("  Output:  {}", output);
    println!("  Backend: {}", backend_name());
    println!();

    if !Path::new(input).exists() {
        println!("{} Input path not found: {}", "Error:".red(), input);
        return Ok(());
    }
    if !Path::new(model).exists() {
        println!("{} Model path not found: {}", "Error:".red(), model);
        return Ok(());
    }

    let (overlay_format, weights) = match format.to_lowercase().as_str() {
        "png" => (OverlayFormat::Png, GRADCAM_BLEND),
        "jpeg" | "jpg" => (OverlayFormat::Jpeg, HEATMAP_BLEND),
        other => {
            println!(
                "{} Unknown format '{}', expected png or jpeg",
                "Error:".red(),
                other
            );
            return Ok(());
        }
    };

    println!("{}", "Loading model...".cyan());
    let context = load_context(model, taxonomy)?;

    let bytes = fs::read(input)?;
    let encoded = context.overlay(&bytes, weights, overlay_format)?;

    if let Some(parent) = Path::new(output).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, &encoded)?;

    println!();
    println!(
        "{} Wrote {} overlay to {}",
        "Done:".green().bold(),
        overlay_format.content_type(),
        output
    );

    Ok(())
}

fn cmd_init_model(output: &str, taxonomy_output: &str, seed: u64) -> Result<()> {
    use burn::module::Module;
    use burn::record::CompactRecorder;
    use burn::tensor::backend::Backend;

    println!("{}", "Initializing model artifacts...".cyan().bold());
    println!("  Model:    {}", output);
    println!("  Taxonomy: {}", taxonomy_output);
    println!("  Seed:     {}", seed);
    println!();

    ServingBackend::seed(seed);
    let device = default_device();

    let taxonomy = Taxonomy::default_classes();
    let config = LeafClassifierConfig::new().with_num_classes(taxonomy.len());
    let model = LeafClassifier::<ServingBackend>::new(&config, &device);

    if let Some(parent) = Path::new(output).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let recorder = CompactRecorder::new();
    model
        .save_file(output, &recorder)
        .map_err(|e| anyhow::anyhow!("Failed to save model: {:?}", e))?;

    if let Some(parent) = Path::new(taxonomy_output).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let names: Vec<&str> = taxonomy.iter().collect();
    fs::write(taxonomy_output, serde_json::to_string_pretty(&names)?)?;

    println!(
        "{} Wrote randomly initialized weights for {} classes",
        "Done:".green().bold(),
        taxonomy.len()
    );
    println!("  Note: predictions are meaningless until trained weights replace them");

    Ok(())
}

fn cmd_classes(taxonomy: Option<&str>) -> Result<()> {
    let taxonomy = load_taxonomy(taxonomy)?;

    println!("{}", "Diagnosable Classes:".cyan().bold());
    for (idx, name) in taxonomy.iter().enumerate() {
        match taxonomy.label(idx) {
            Ok(label) => {
                let status = if label.is_healthy() {
                    "healthy".green()
                } else {
                    label.condition.as_str().yellow()
                };
                println!("  {:>3}  {:30} {}", idx, label.plant, status);
            }
            Err(_) => {
                println!("  {:>3}  {} {}", idx, name, "(malformed)".red());
            }
        }
    }
    println!();
    println!("  Total: {} classes", taxonomy.len());

    Ok(())
}
