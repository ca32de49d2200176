mod cli;
mod progress;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    // Before starting the potentially long computation, make sure that we can
    // write the result to the requested destination.
    if let Some(dir) = args.out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let mut stages = Stages::new();
    stages.begin(&format!("Reading {}", args.config.display()));
    let mut config = read_config_file(args.config.clone())?;
    if let Some(n_voxels) = args.n_voxels { config.volume.size = n_voxels; }
    stages.end();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build()?;
    let image = pool.install(|| match args.command {
        Command::Phantom => make_phantom(&config, &mut stages),
        Command::Project => make_projections(&config, &mut stages),
    })?;

    stages.begin(&format!("Writing {}", args.out.display()));
    raw::write_image(&image, &args.out)?;
    stages.end();
    stages.summary();
    Ok(())
}

fn make_phantom(config: &Config, stages: &mut Stages) -> Result<Image> {
    let phantom = config.phantom.phantom()?;
    let geometry = config.volume.geometry()?;
    stages.begin(&format!("Rasterizing {} primitives onto {} voxels",
                            phantom.primitives().len(), group_digits(geometry.n_voxels())));
    let image = rasterize(&phantom, &geometry)?;
    stages.end();
    Ok(image)
}

fn make_projections(config: &Config, stages: &mut Stages) -> Result<Image> {
    let phantom = config.phantom.phantom()?;
    let geometry = config.trajectory.geometry()?;
    let stack_geometry = config.detector.stack_geometry(geometry.len())?;
    let mut stack = ConstantSource::new(stack_geometry, 0.0)
        .in_space(Space::Detector)
        .generate()?;

    let volume = match config.projector.sampling() {
        Some(sampling) => Some((make_phantom(config, stages)?, sampling)),
        None => None,
    };
    let attenuation = match &volume {
        Some((image, sampling)) => Attenuation::Voxels { image, sampling: *sampling },
        None => Attenuation::Phantom(&phantom),
    };
    let projection = Projection::builder()
        .with_attenuation(attenuation)
        .with_projections(&stack)
        .with_geometry(&geometry)
        .build()?;

    stages.begin_line(&format!("Projecting ({:?})", config.projector.method));
    let [nu, nv, n_projections] = stack.geometry().size();
    let bar = ProjectionBar::new(n_projections);
    for k in 0..n_projections {
        let one = SubRegion::new([0, 0, k as i64], [nu, nv, 1]);
        projection.run_region(&mut stack, &one, Accumulate::Overwrite)?;
        bar.projection_done();
    }
    bar.finish(stack.geometry().n_voxels());
    stages.end_with("Projected");
    Ok(stack)
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;

use clap::Parser;

use conebeam::{
    config::{read_config_file, Config},
    error::Result,
    image::{Accumulate, Image, Space},
    io::raw,
    projector::{Attenuation, Projection},
    rasterize::rasterize,
    region::SubRegion,
    source::ConstantSource,
    utils::{group_digits, timing::Stages},
};

use cli::{Cli, Command};
use progress::ProjectionBar;
