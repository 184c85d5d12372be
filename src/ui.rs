//! Terminal presentation for the scan workflow: spinners and colored output.
//!
//! Uses `indicatif` for the submission and success-cue spinners and
//! `console` for styling. [`ScanProgress`] follows one photo through the
//! workflow on screen.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use carscan::services::InMemoryImageStore;
use carscan::workflow::{
    CameraSettings, CapturedPhoto, Facing, FlashMode, PredictionResult, SubmitOutcome,
};

/// Spinner and status lines for one scan.
pub struct ScanProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl ScanProgress {
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Shows the photo under review.
    pub fn reviewing(&self, photo: &CapturedPhoto, settings: &CameraSettings) {
        let facing = match settings.facing {
            Facing::Back => "back",
            Facing::Front => "front",
        };
        let flash = match settings.flash {
            FlashMode::Off => "off",
            FlashMode::On => "on",
        };
        self.pb.println(format!(
            "  Reviewing {} {}",
            photo.uri(),
            self.dim
                .apply_to(format!("({} via {facing} camera, flash {flash})", photo.source()))
        ));
    }

    pub fn submitting(&self) {
        self.pb.set_message("Predicting...");
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    /// Prints the outcome and, on success, keeps the spinner up for the cue.
    pub fn outcome(&self, outcome: &SubmitOutcome, results_route: &str) {
        match outcome {
            SubmitOutcome::Succeeded(result) => {
                self.pb.println(format!(
                    "  {} Predicted car: {}",
                    self.green.apply_to("✓"),
                    result.label
                ));
                self.pb.set_message(redirect_message(results_route));
            }
            SubmitOutcome::Failed(reason) => {
                self.pb.finish_and_clear();
                println!("  {} Submission failed: {reason}", self.red.apply_to("✗"));
            }
            SubmitOutcome::Ignored => {
                self.pb.finish_and_clear();
                println!("  {} Nothing to submit", self.red.apply_to("✗"));
            }
        }
    }

    pub fn navigated(&self, route: Option<&str>) {
        self.pb.finish_and_clear();
        if let Some(route) = route {
            println!("  → {route}");
        }
    }
}

fn redirect_message(route: &str) -> String {
    format!("Analysis successful! Redirecting to {route}...")
}

/// Pretty-prints the prediction details as JSON.
pub fn print_details(result: &PredictionResult) {
    if result.details.is_null() {
        return;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&result.details).unwrap_or_default()
    );
}

/// Lists what the local store holds after the run.
pub fn print_local_images(store: &InMemoryImageStore) {
    let images = store.images();
    if images.is_empty() {
        return;
    }
    let dim = Style::new().dim();
    println!();
    println!("{}", dim.apply_to("─── Local Library ───"));
    for image in images {
        let when = image
            .stored_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("  {when}  {}  {}", image.prediction, image.image_uri);
    }
}

/// Prints one zoom level per gesture.
pub fn print_zoom_levels(levels: &[f64]) {
    for (i, level) in levels.iter().enumerate() {
        println!("  {:>3}  {level:.4}", i + 1);
    }
}
