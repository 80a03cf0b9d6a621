use anyhow::Context;
use libgeotag::{
    config::Settings,
    files, logging,
    pipeline::{JpegStore, Pipeline},
    track, version,
};
use tracing::{error, info};

fn run(settings: Settings) -> anyhow::Result<()> {
    let track = track::load_file(&settings.gpx_location, settings.gpx_source)
        .with_context(|| format!("unable to load {}", settings.gpx_location.display()))?;
    let images = files::list_images(&settings.input_location)?;

    let pipeline = Pipeline::new(
        track,
        settings.correction,
        settings.time_corrector(),
        JpegStore,
    )?
    .with_tolerance(settings.tolerance_seconds)
    .with_missing_time_policy(settings.on_missing_time)
    .dry_run(settings.dry_run);

    let summary = pipeline.run(&images)?;
    println!(
        "{} images: {} tagged, {} without a matching track point, {} skipped",
        summary.images.len(),
        summary.tagged(),
        summary.unmatched(),
        summary.skipped()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_args();
    logging::init_tracing(settings.log_level);
    info!("{}", version::banner());

    run(settings).map_err(|e| {
        error!("{:#}", e);
        e
    })
}
