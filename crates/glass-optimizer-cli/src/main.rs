use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use glass_optimizer_core::{
    insights, render_report, render_svg, EnhancedOptimizationResult, GlassProject,
    OptimizationContext, OptimizationRequest, OptimizationResult, Optimizer, OptimizerConfig,
    PlateOrientation, ProjectRepository,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod store;

use store::FileProjectRepository;

#[derive(Parser)]
#[command(name = "glass-optimizer")]
#[command(about = "Glass Cutting Optimizer - Plan guillotine cuts over stock plates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a cutting request
    Optimize {
        /// Request file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Optimizer thresholds and weights (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the business context of the request
        #[arg(long)]
        context: Option<OptimizationContext>,

        /// Promote the plan at this rank (0 = best) to primary
        #[arg(long)]
        pick: Option<usize>,

        /// Output file for the result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate an SVG diagram from a result
    Generate {
        /// Result file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,

        /// Corner the operator measures from
        #[arg(long, default_value = "top-left")]
        orientation: PlateOrientation,
    },

    /// Print a workshop report for a result
    Report {
        /// Result file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Corner the operator measures from
        #[arg(long, default_value = "top-left")]
        orientation: PlateOrientation,
    },

    /// Manage saved projects
    Project {
        /// Directory holding saved projects
        #[arg(long, default_value = "glass-projects", global = true)]
        store: PathBuf,

        #[command(subcommand)]
        action: ProjectAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Save a request, optionally with its result
    Save {
        #[arg(short, long)]
        name: String,

        /// Request file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Result file (JSON) to store with the project
        #[arg(short, long)]
        result: Option<PathBuf>,

        #[arg(long, default_value = "top-left")]
        orientation: PlateOrientation,
    },
    /// Print a saved project as JSON
    Load { id: String },
    /// List saved projects, newest first
    List,
    /// Delete a saved project
    Delete { id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            config,
            context,
            pick,
            output,
        } => {
            optimize_command(input, config, context, pick, output)?;
        }
        Commands::Generate {
            input,
            output,
            orientation,
        } => {
            generate_command(input, output, orientation)?;
        }
        Commands::Report {
            input,
            output,
            orientation,
        } => {
            report_command(input, output, orientation)?;
        }
        Commands::Project { store, action } => {
            project_command(store, action)?;
        }
    }

    Ok(())
}

/// Reads YAML or JSON depending on the file extension.
fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str());
    let value = if ext == Some("yaml") || ext == Some("yml") {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(value)
}

/// Accepts either a full optimization result or a bare plan.
fn load_plan(path: &Path) -> Result<(OptimizationResult, Option<EnhancedOptimizationResult>)> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if let Ok(enhanced) = serde_json::from_str::<EnhancedOptimizationResult>(&content) {
        return Ok((enhanced.primary.clone(), Some(enhanced)));
    }
    let plan = serde_json::from_str::<OptimizationResult>(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok((plan, None))
}

fn optimize_command(
    input: PathBuf,
    config: Option<PathBuf>,
    context: Option<OptimizationContext>,
    pick: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "🔍 Loading input...".bright_blue());

    let mut request: OptimizationRequest = load_file(&input)?;
    if let Some(context) = context {
        request.options.context = context;
    }
    let config = match config {
        Some(path) => load_file::<OptimizerConfig>(&path)?,
        None => OptimizerConfig::default(),
    };

    let pieces: u32 = request.cuts.iter().map(|c| c.quantity).sum();
    println!(
        "  {} cuts ({} pieces) on {} × {} cm plates",
        request.cuts.len().to_string().bright_white().bold(),
        pieces.to_string().bright_white().bold(),
        request.plate_width,
        request.plate_height
    );
    println!("  Context: {}", request.options.context.to_string().bright_white());
    println!();

    println!("{}", "🚀 Running optimization...".bright_blue());

    let optimizer = Optimizer::with_config(request, config)?;
    let mut result = optimizer.optimize();
    if let Some(index) = pick {
        result = pick_plan(result, index)?;
    }

    println!();
    if result.validation.is_valid {
        println!("{}", "✅ Optimization complete!".bright_green().bold());
    } else {
        println!("{}", "⚠️  Optimization finished with errors".bright_red().bold());
    }
    println!();

    print_summary(&result);

    let json = serde_json::to_string_pretty(&result)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, json)?;
        println!(
            "💾 Saved result to {}",
            output_path.display().to_string().bright_white()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Makes the plan at `index` of the ranking the primary one.
fn pick_plan(result: EnhancedOptimizationResult, index: usize) -> Result<EnhancedOptimizationResult> {
    let ranked = result.ranked();
    let Some(selected) = ranked.select(index) else {
        bail!(
            "--pick {} is out of range, {} plan(s) available",
            index,
            ranked.len()
        );
    };

    let mut plans = selected.plans().iter().cloned();
    let mut scores = selected.scores().iter().copied();
    let (Some(primary), Some(primary_score)) = (plans.next(), scores.next()) else {
        bail!("no plan to pick");
    };

    Ok(EnhancedOptimizationResult {
        primary,
        primary_score,
        alternatives: plans.collect(),
        alternative_scores: scores.collect(),
        ..result
    })
}

fn print_summary(result: &EnhancedOptimizationResult) {
    let primary = &result.primary;

    println!("{}", "📊 Results:".bright_yellow().bold());
    println!(
        "  Strategy: {}",
        primary.strategy.name.bright_white().bold()
    );
    println!(
        "  Total plates: {}",
        primary.total_plates.to_string().bright_white().bold()
    );
    println!(
        "  Average utilization: {}%",
        format!("{:.1}", primary.average_utilization).bright_white()
    );
    println!(
        "  Guillotine cuts: {}",
        primary.total_guillotine_cuts.to_string().bright_white()
    );
    println!(
        "  Reusable offcuts: {}",
        primary
            .waste_quality
            .reusable_waste_pieces
            .to_string()
            .bright_green()
    );
    println!(
        "  Score: {}/100 ({} confidence)",
        format!("{:.1}", result.primary_score.total_score).bright_white(),
        result.metadata.confidence_level
    );

    println!();
    for line in insights(result) {
        println!("  • {}", line);
    }

    if !result.suggestions.is_empty() {
        println!();
        println!("  Suggestions:");
        for suggestion in result.suggestions.iter().take(5) {
            println!(
                "    [{}] {}",
                suggestion.kind.to_string().bright_cyan(),
                suggestion.description
            );
        }
    }

    for warning in &result.validation.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    for error in &result.validation.errors {
        println!("  {} {}", "error:".bright_red(), error);
    }
    println!();
}

fn generate_command(input: PathBuf, output: PathBuf, orientation: PlateOrientation) -> Result<()> {
    println!("{}", "🔍 Loading result...".bright_blue());
    let (plan, _) = load_plan(&input)?;

    println!("{}", "🎨 Generating SVG...".bright_blue());
    let svg = render_svg(&plan, orientation)?;
    std::fs::write(&output, svg)?;

    println!();
    println!(
        "{} Saved SVG to {}",
        "✅".bright_green(),
        output.display().to_string().bright_white()
    );

    Ok(())
}

fn report_command(
    input: PathBuf,
    output: Option<PathBuf>,
    orientation: PlateOrientation,
) -> Result<()> {
    let (_, enhanced) = load_plan(&input)?;
    let Some(result) = enhanced else {
        bail!(
            "{} holds a bare plan; reports need the full output of `optimize`",
            input.display()
        );
    };

    let report = render_report(&result, orientation)?;
    match output {
        Some(path) => {
            std::fs::write(&path, report)?;
            println!(
                "{} Saved report to {}",
                "✅".bright_green(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}

fn project_command(store: PathBuf, action: ProjectAction) -> Result<()> {
    let mut repo = FileProjectRepository::open(store)?;

    match action {
        ProjectAction::Save {
            name,
            input,
            result,
            orientation,
        } => {
            let request: OptimizationRequest = load_file(&input)?;
            let mut project =
                GlassProject::new(name, request.plate_width, request.plate_height, request.cuts)
                    .with_orientation(orientation);
            if let Some(path) = result {
                let (plan, _) = load_plan(&path)?;
                project = project.with_result(plan);
            }

            let id = repo.save(project)?;
            println!("💾 Saved project {}", id.bright_white().bold());
        }
        ProjectAction::Load { id } => {
            let project = repo.load(&id)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectAction::List => {
            let projects = repo.list()?;
            if projects.is_empty() {
                println!("No saved projects");
            }
            for project in projects {
                let plates = project
                    .optimization_result
                    .as_ref()
                    .map_or("not optimized".to_string(), |r| format!("{} plate(s)", r.total_plates));
                println!(
                    "  {}  {}  {} × {} cm, {} cut(s), {}",
                    project.id.bright_white().bold(),
                    project.project_name,
                    project.plate_width,
                    project.plate_height,
                    project.cuts_requested.len(),
                    plates
                );
            }
        }
        ProjectAction::Delete { id } => {
            repo.delete(&id)?;
            println!("🗑️  Deleted project {}", id.bright_white());
        }
    }

    Ok(())
}
