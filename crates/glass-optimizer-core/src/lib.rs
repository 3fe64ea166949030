//! Glass cutting-stock optimizer.
//!
//! Given a stock plate size and a list of requested rectangular cuts, plans
//! guillotine-cuttable layouts over as few plates as possible, scores the
//! candidate plans for a business context and returns the best one with
//! ranked alternatives, a validation report and an ordered cut sequence.
//!
//! ```no_run
//! use glass_optimizer_core::{optimize, CutRequest, OptimizeOptions};
//!
//! let cuts = vec![CutRequest::new("window", 60.0, 45.0, 4)];
//! let result = optimize(&cuts, 260.0, 180.0, OptimizeOptions::default())?;
//! println!("{} plate(s)", result.primary.total_plates);
//! # Ok::<(), glass_optimizer_core::OptimizerError>(())
//! ```

pub mod config;
pub mod geometry;
pub mod optimizer;
pub mod orientation;
pub mod project;
pub mod render;
pub mod report;
pub mod types;

pub use config::OptimizerConfig;
pub use optimizer::{insights, optimize, Optimizer};
pub use orientation::{transform_plate, transform_result, PlateOrientation};
pub use project::{GlassProject, InMemoryProjectRepository, ProjectRepository};
pub use render::render_svg;
pub use report::render_report;
pub use types::*;
