use std::path::Path;

use anyhow::Context;
use posemark::nn::YoloPose;
use posemark::pipeline::Pipeline;
use posemark::timer::Timer;

/// Class names used when `POSEMARK_CLASSES` is not set.
const DEFAULT_CLASSES: &str = "knob";

fn main() -> anyhow::Result<()> {
    posemark::init_logger!();

    let mut args = std::env::args_os().skip(1);
    let (Some(model_path), Some(input_dir), Some(output_dir)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: posemark <model.onnx> <input-dir> <output-dir>");
        std::process::exit(1);
    };

    let t_run = Timer::new("run");
    let guard = t_run.start();

    let names = std::env::var("POSEMARK_CLASSES")
        .unwrap_or_else(|_| DEFAULT_CLASSES.to_owned())
        .split(',')
        .map(|name| name.trim().to_owned())
        .collect();
    let mut model = YoloPose::load(&model_path, names)?;
    if let Ok(threshold) = std::env::var("POSEMARK_THRESHOLD") {
        model.set_threshold(
            threshold
                .parse()
                .context("POSEMARK_THRESHOLD must be a number between 0.0 and 1.0")?,
        );
    }
    log::info!("model loaded from '{}'", Path::new(&model_path).display());

    let mut pipeline = Pipeline::new();
    let summary = pipeline.run(&mut model, Path::new(&input_dir), Path::new(&output_dir))?;

    drop(guard);
    for timer in pipeline.timers() {
        log::info!("{timer}");
    }
    log::info!(
        "wrote {} of {} candidate(s) ({} failed) in {:.1} ms",
        summary.written,
        summary.candidates,
        summary.failed,
        t_run.last_ms(),
    );

    Ok(())
}
