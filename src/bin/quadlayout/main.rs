//! quadlayout CLI - cross-field quad layout of triangulated surfaces.
//!
//! Usage: quadlayout <COMMAND> [OPTIONS] <INPUT>
//!
//! Run `quadlayout --help` for available commands. Set `RUST_LOG=debug` for
//! per-stage summaries.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};

use quadlayout::algo::cutgraph::GroupKind;
use quadlayout::algo::separatrix::PathKind;
use quadlayout::algo::{
    quad_layout, quad_layout_with_progress, CrossFieldMethod, LayoutOptions, Progress, QuadLayoutResult, SolverKind,
};
use quadlayout::io;
use quadlayout::mesh::{SurfaceMesh, VertexClass};

#[derive(Parser)]
#[command(name = "quadlayout")]
#[command(author, version, about = "Cross-field quad layout CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display surface topology, singularities, cut groups and separatrices
    Info {
        /// Input surface file
        input: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Compute the quad layout and print the block report
    Layout {
        /// Input surface file
        input: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(Args)]
struct LayoutArgs {
    /// Target number of quads over the whole surface
    #[arg(short, long, default_value = "1000")]
    target: usize,

    /// Cross field method
    #[arg(short, long, value_enum, default_value = "relaxation")]
    method: FieldMethod,

    /// Implicit heat levels for the heat-diffusion method
    #[arg(long, default_value = "8")]
    diffusion_levels: usize,

    /// Relaxation convergence tolerance (radians)
    #[arg(long, default_value = "1e-6")]
    tol: f64,

    /// Linear solver for the potentials
    #[arg(long, value_enum, default_value = "auto")]
    solver: Solver,

    /// Use single-threaded execution (for benchmarking)
    #[arg(long)]
    sequential: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FieldMethod {
    /// Circular-mean relaxation
    Relaxation,
    /// Heat diffusion followed by relaxation
    Heat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Solver {
    /// Dense below a size limit, sparse above
    Auto,
    /// Dense LU
    Dense,
    /// Sparse conjugate gradient
    Sparse,
}

impl LayoutArgs {
    fn options(&self) -> LayoutOptions {
        let method = match self.method {
            FieldMethod::Relaxation => CrossFieldMethod::Relaxation,
            FieldMethod::Heat => CrossFieldMethod::HeatDiffusion,
        };
        let solver = match self.solver {
            Solver::Auto => SolverKind::Auto,
            Solver::Dense => SolverKind::Dense,
            Solver::Sparse => SolverKind::Sparse,
        };
        LayoutOptions::default()
            .with_target_quad_count(self.target)
            .with_cross_field_method(method)
            .with_diffusion_levels(self.diffusion_levels)
            .with_convergence_tol(self.tol)
            .with_solver(solver)
            .with_parallel(!self.sequential)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, layout } => cmd_info(&input, &layout)?,
        Commands::Layout { input, layout } => cmd_layout(&input, &layout)?,
    }
    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }
        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Components run in parallel and report out of order; only ever move forward.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (raw_percent * bar_width) / 100;
        eprint!(
            "\r[{}{}] {:3}% {:<16}",
            "=".repeat(filled),
            " ".repeat(bar_width - filled),
            raw_percent,
            message
        );
        let _ = std::io::stderr().flush();
        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &PathBuf, args: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let surface: SurfaceMesh = io::load(input)?;
    let mesh = surface.mesh();

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", mesh.num_edges());
    if !surface.dropped_faces().is_empty() {
        println!("Dropped non-manifold faces: {}", surface.dropped_faces().len());
    }
    println!("Surface area: {:.6}", mesh.surface_area());
    if let Some((min, max)) = mesh.bounding_box() {
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }
    println!("Euler characteristic: {}", surface.euler_characteristic());

    let corners = mesh.vertex_ids().filter(|&v| surface.vertex_class(v) == VertexClass::Corner).count();
    let internal = surface.curves().iter().filter(|c| c.is_internal()).count();
    println!(
        "Curves: {} ({} internal, {} periodic), {} corners",
        surface.curves().len(),
        internal,
        surface.curves().iter().filter(|c| c.is_periodic()).count(),
        corners
    );

    let result = quad_layout(&surface, &args.options())?;

    println!("\nComponents: {}", result.components().len());
    for (c, component) in result.components().iter().enumerate() {
        let field = &component.field;
        let sing = &component.singularities;
        println!("\nComponent {}:", c);
        println!(
            "  Cross field: {} sweeps, residual {:.2e}{}",
            field.sweeps(),
            field.residual(),
            if field.is_converged() { "" } else { " (not converged)" }
        );
        println!(
            "  Index sum: {} quarter turns, expected {} (chi = {})",
            sing.index_sum(),
            4 * sing.euler_characteristic(),
            sing.euler_characteristic()
        );
        for s in sing.singularities() {
            let p = s.position;
            println!(
                "    {:>+3}/4 {:?} at ({:.4}, {:.4}, {:.4})",
                s.index, s.kind, p.x, p.y, p.z
            );
        }
        if !sing.forced_corners().is_empty() {
            println!("  Forced corners: {}", sing.forced_corners().len());
        }
        if !sing.unreliable().is_empty() {
            println!("  Unreliable vertex indices: {}", sing.unreliable().len());
        }

        let graph = &component.cut_graph;
        let count = |kind: GroupKind| graph.groups().iter().filter(|g| g.kind == kind).count();
        println!(
            "  Cut graph: {} cut edges, groups {} boundary / {} cut / {} internal, {} invalid",
            graph.num_cut_edges(),
            count(GroupKind::Boundary),
            count(GroupKind::Cut),
            count(GroupKind::InternalBoundary),
            graph.groups().iter().filter(|g| !g.valid).count()
        );
        println!(
            "  Potentials: scale {:.4}, transition residual {:.2e}",
            component.potential.scale(),
            component.potential.max_transition_residual(graph)
        );

        let paths = &component.separatrices;
        println!(
            "  Separatrices: {} to singularity, {} to boundary, {} lost, {} redundant",
            paths.count(PathKind::SingToSing),
            paths.count(PathKind::SingToBdry),
            paths.count(PathKind::SingToNothing),
            paths.count(PathKind::Redundant)
        );
    }

    print_issues(&result);
    Ok(())
}

fn cmd_layout(input: &PathBuf, args: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let surface: SurfaceMesh = io::load(input)?;
    println!(
        "Loaded: {} vertices, {} faces",
        surface.mesh().num_vertices(),
        surface.mesh().num_faces()
    );

    let options = args.options();
    let mode = if args.sequential { "sequential" } else { "parallel" };
    println!("Computing layout (target {} quads, {})...", args.target, mode);

    let progress = create_progress();
    let start = Instant::now();
    let result = quad_layout_with_progress(&surface, &options, &progress)?;
    let elapsed = start.elapsed();

    println!("\nBlocks: {} ({:.2?})", result.num_patches(), elapsed);
    for (c, component) in result.components().iter().enumerate() {
        let layout = &component.layout;
        println!(
            "Component {}: {} blocks, {} triangles, {} separatrix curves ({} edges)",
            c,
            layout.num_patches(),
            layout.num_triangles(),
            layout.separatrix_curves().len(),
            layout.num_separatrix_edges()
        );
        if layout.excluded_chords() > 0 || layout.unsplit_chords() > 0 {
            println!(
                "  Chords excluded at T-junctions: {}, unsplit: {}",
                layout.excluded_chords(),
                layout.unsplit_chords()
            );
        }
        let scale = component.potential.scale();
        for p in 0..layout.num_patches() {
            let area = layout.patch_area(p);
            println!(
                "  block {:>4}: {:>5} triangles, area {:.6} (~{:.1} quads)",
                p,
                layout.patch_triangles(p).len(),
                area,
                area / (scale * scale)
            );
        }
    }

    print_issues(&result);
    if !result.is_success() {
        return Err("layout finished with errors".into());
    }
    Ok(())
}

fn print_issues(result: &QuadLayoutResult) {
    let issues = result.diagnostics().issues();
    if issues.is_empty() {
        return;
    }
    println!("\nIssues ({}):", issues.len());
    for issue in issues {
        println!("  {}", issue);
    }
}
