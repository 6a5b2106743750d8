//! The batch pipeline: enumerate candidate files, then decode, infer, annotate and encode each
//! one in sequence.
//!
//! Every stage failure is terminal for that file only; the run always continues with the next
//! candidate and finishes with a [`RunSummary`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::annotate::Annotator;
use crate::detection::PoseModel;
use crate::image::ImageBuffer;
use crate::timer::Timer;

/// File extensions accepted as candidates, matched case-sensitively.
const CANDIDATE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Returns a lazy iterator over the candidate image files in `dir`, in the directory's native
/// enumeration order.
///
/// Only failure to open the directory itself is an error; unreadable individual entries are
/// logged and skipped.
pub fn candidates(dir: &Path) -> anyhow::Result<impl Iterator<Item = PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot open input directory '{}'", dir.display()))?;

    Ok(entries.filter_map(|entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable directory entry: {e}");
                return None;
            }
        };
        let path = entry.path();
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) if is_candidate(name) => Some(path),
            _ => None,
        }
    }))
}

fn is_candidate(name: &str) -> bool {
    CANDIDATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Derives the output file name for an input: `<output_dir>/<stem>_out.png`.
///
/// Inputs whose basenames collide after stripping the extension overwrite each other's output;
/// an accepted limitation of the naming scheme.
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}_out.png"))
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of candidate files encountered.
    pub candidates: usize,
    /// Number of annotated output files written.
    pub written: usize,
    /// Number of candidates skipped because a stage failed.
    pub failed: usize,
}

/// Drives one pass over all candidate files of an input directory.
pub struct Pipeline {
    annotator: Annotator,
    t_infer: Timer,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_annotator(Annotator::default())
    }

    pub fn with_annotator(annotator: Annotator) -> Self {
        Self {
            annotator,
            t_infer: Timer::new("infer"),
        }
    }

    /// Processes every candidate file in `input_dir` and writes annotated copies to
    /// `output_dir`, creating it if necessary.
    ///
    /// Decode, inference and encode failures are logged with the file path and skip only the
    /// affected file. Each image buffer lives for exactly one loop iteration and is dropped on
    /// every exit path.
    pub fn run(
        &mut self,
        model: &mut dyn PoseModel,
        input_dir: &Path,
        output_dir: &Path,
    ) -> anyhow::Result<RunSummary> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("cannot create output directory '{}'", output_dir.display()))?;

        let mut summary = RunSummary::default();
        for path in candidates(input_dir)? {
            summary.candidates += 1;

            let mut image = match ImageBuffer::load(&path) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("{}: decode failed: {e:#}", path.display());
                    summary.failed += 1;
                    continue;
                }
            };

            let detections = match self.t_infer.time(|| model.infer(&image)) {
                Ok(detections) => detections,
                Err(e) => {
                    log::warn!("{}: inference failed: {e:#}", path.display());
                    summary.failed += 1;
                    continue;
                }
            };
            log::info!(
                "{}: {} detection(s) in {:.1} ms",
                path.display(),
                detections.len(),
                self.t_infer.last_ms(),
            );
            for detection in detections.iter() {
                let b = detection.bounding_box();
                log::debug!(
                    "{} @ ({} {} {} {}) {:.3}",
                    model.class_name(detection.class_id()),
                    b.left(),
                    b.top(),
                    b.right(),
                    b.bottom(),
                    detection.confidence(),
                );
            }

            self.annotator
                .annotate(&mut image, &detections, |id| model.class_name(id).to_owned());

            let output = output_path(output_dir, &path);
            if let Err(e) = image.save(&output) {
                log::warn!("{}: encode failed: {e:#}", output.display());
                summary.failed += 1;
                continue;
            }
            summary.written += 1;
        }

        Ok(summary)
    }

    /// Returns the pipeline's timers, for reporting at the end of a run.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer].into_iter()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_extensions_are_case_sensitive() {
        assert!(is_candidate("photo.jpg"));
        assert!(is_candidate("photo.jpeg"));
        assert!(is_candidate("photo.png"));

        assert!(!is_candidate("photo.JPG"));
        assert!(!is_candidate("photo.Jpeg"));
        assert!(!is_candidate("photo.bmp"));
        assert!(!is_candidate("photo.png.txt"));
        assert!(!is_candidate("photo"));
    }

    #[test]
    fn output_name_strips_one_extension() {
        let out = Path::new("out");
        assert_eq!(
            output_path(out, Path::new("in/photo.jpg")),
            Path::new("out/photo_out.png"),
        );
        assert_eq!(
            output_path(out, Path::new("in/archive.v2.jpeg")),
            Path::new("out/archive.v2_out.png"),
        );
    }

    #[test]
    fn enumerating_a_missing_directory_is_fatal() {
        assert!(candidates(Path::new("/nonexistent/posemark-input")).is_err());
    }
}
