use clap::Parser;
use panel_aero_core::task::TaskMessage;
use panel_aero_core::viscous::ViscousPolar;
use panel_aero_core::{
    AnalysisConfig, GroundEffect, LiftingSurfaceBuilder, LinearPolar, MethodKind,
    OperatingPoint, Task, TaskStatus, WakeKind,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Angle of attack sweep on a rectangular wing
#[derive(Parser, Debug)]
#[command(name = "panel-aero-demo")]
#[command(about = "Panel method analysis of a rectangular wing", long_about = None)]
struct Args {
    /// Wing span in meters
    #[arg(short, long, default_value_t = 8.0)]
    span: f64,

    /// Wing chord in meters
    #[arg(short, long, default_value_t = 1.0)]
    chord: f64,

    /// Chordwise panels
    #[arg(long, default_value_t = 4)]
    chordwise: usize,

    /// Spanwise panels
    #[arg(long, default_value_t = 20)]
    spanwise: usize,

    /// First angle of attack in degrees
    #[arg(long, default_value_t = -2.0)]
    alpha_start: f64,

    /// Last angle of attack in degrees
    #[arg(long, default_value_t = 8.0)]
    alpha_end: f64,

    /// Angle of attack step in degrees
    #[arg(long, default_value_t = 2.0)]
    alpha_step: f64,

    /// Freestream speed in m/s
    #[arg(short, long, default_value_t = 20.0)]
    qinf: f64,

    /// Use the vortex-particle wake instead of the flat wake
    #[arg(long)]
    particle_wake: bool,

    /// Use quad doublet panels instead of the vortex lattice
    #[arg(long)]
    panel_method: bool,

    /// Run the virtual-twist loop against a thin-airfoil polar
    #[arg(short, long)]
    viscous: bool,

    /// Height of a ground plane below the wing in meters
    #[arg(short, long)]
    ground: Option<f64>,

    /// Also compute stability derivatives
    #[arg(long)]
    stability: bool,
}

fn alpha_sweep(start: f64, end: f64, step: f64, qinf: f64) -> Vec<OperatingPoint> {
    if step <= 0.0 || end < start {
        return vec![OperatingPoint::new(start, qinf)];
    }
    let count = ((end - start) / step + 1e-9).floor() as usize + 1;
    (0..count)
        .map(|k| OperatingPoint::new(start + step * k as f64, qinf))
        .collect()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    println!("=== Panel Method Demo ===\n");

    let builder = LiftingSurfaceBuilder::rectangular(args.span, args.chord)
        .with_panels(args.chordwise, args.spanwise);
    let mesh = match builder.build() {
        Ok(mesh) => mesh,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let reference = builder.reference();
    println!(
        "Wing: span {:.2} m, chord {:.2} m, AR {:.2}, {} panels, {} stations",
        reference.span,
        reference.chord,
        reference.aspect_ratio(),
        mesh.n_panels(),
        mesh.n_stations()
    );

    let mut config = AnalysisConfig::default();
    if args.panel_method {
        config.solver.method = MethodKind::Panel;
    }
    if args.particle_wake {
        config.wake.kind = WakeKind::Particle;
    }
    if let Some(height) = args.ground {
        config.fluid.ground_effect = GroundEffect::Ground { height };
    }
    config.solver.stability_derivatives = args.stability;
    config.viscous.enabled = args.viscous;
    let polar: Option<Arc<dyn ViscousPolar>> = if args.viscous {
        Some(Arc::new(LinearPolar::default()))
    } else {
        None
    };

    let points = alpha_sweep(args.alpha_start, args.alpha_end, args.alpha_step, args.qinf);
    info!("Sweeping {} operating points", points.len());

    let mut task = match Task::new(&mesh, reference, config, polar, points) {
        Ok(task) => task,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let controller = task.controller();
    let messages = controller.messages();

    let (status, results) = thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let status = task.run();
            (status, task.into_results())
        });
        while !worker.is_finished() || !messages.is_empty() {
            match messages.wait_pop(Duration::from_millis(50)) {
                Some(TaskMessage::Log(line)) => println!("  {line}"),
                Some(TaskMessage::LiveUpdate { vortons, .. }) => {
                    let active: usize = vortons.iter().map(|row| row.active().count()).sum();
                    println!("  wake: {} rows, {} vortons", vortons.len(), active);
                }
                None => {}
            }
        }
        worker.join()
    })
    .unwrap_or((TaskStatus::Cancelled, Vec::new()));

    println!("\n{:>8} {:>10} {:>10} {:>10} {:>8}", "alpha", "CL", "CD", "Cm", "e");
    for result in &results {
        let forces = &result.forces;
        println!(
            "{:>8.2} {:>10.5} {:>10.6} {:>10.5} {:>8.3}{}",
            result.point.alpha,
            forces.cl(),
            forces.cd(),
            forces.cm(),
            forces.oswald_efficiency(),
            if result.converged { "" } else { "  *" }
        );
        if let Some(stability) = &result.stability {
            println!(
                "         CLa {:.4}  Cma {:.4}  Clp {:.4}  Cnr {:.4}",
                stability.cl_alpha, stability.cm_alpha, stability.croll_p, stability.cn_r
            );
        }
    }

    println!("\nSweep {status:?}");
    if status == TaskStatus::Finished {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
