//! Command-line interface built on clap.
//!
//! [`Cli`] carries the [`Command`] subcommands (submit, zoom, config) and the
//! global flags (--uid, --platform, --verbose).

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use carscan::workflow::{PhotoSource, PinchGesture, Platform};

/// carscan: photograph a car, get it identified, keep the result.
#[derive(Debug, Parser)]
#[command(name = "carscan", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store results for this user instead of keeping them local.
    #[arg(long, global = true)]
    pub uid: Option<String>,

    /// Platform whose pinch sensitivity to use.
    #[arg(long, global = true)]
    pub platform: Option<PlatformArg>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Take the photo with the camera.
    Camera,
    /// Pick the photo from the library.
    Library,
}

impl From<SourceArg> for PhotoSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Camera => PhotoSource::Camera,
            SourceArg::Library => PhotoSource::Library,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlatformArg {
    Ios,
    Android,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Ios => Platform::Ios,
            PlatformArg::Android => Platform::Android,
        }
    }
}

/// A pinch update written as `velocity:scale`, e.g. `40:1.2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureArg(pub PinchGesture);

impl FromStr for GestureArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (velocity, scale) = s
            .split_once(':')
            .ok_or_else(|| format!("expected velocity:scale, got `{s}`"))?;
        let velocity = velocity
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad velocity `{velocity}`: {e}"))?;
        let scale = scale
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad scale `{scale}`: {e}"))?;
        if !velocity.is_finite() || !scale.is_finite() {
            return Err(format!("gesture values must be finite, got `{s}`"));
        }
        Ok(Self(PinchGesture { velocity, scale }))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture or pick a photo and submit it for prediction.
    Submit {
        /// Image file to use as the photo.
        photo: PathBuf,

        /// How the photo is acquired.
        #[arg(long, value_enum, default_value_t = SourceArg::Library)]
        source: SourceArg,

        /// Turn the flash on for camera captures.
        #[arg(long, default_value_t = false)]
        flash: bool,

        /// Use the front camera.
        #[arg(long, default_value_t = false)]
        front: bool,
    },

    /// Replay pinch gestures and print the resulting zoom levels.
    Zoom {
        /// Gestures as `velocity:scale`, applied in order.
        #[arg(required = true, allow_hyphen_values = true)]
        gestures: Vec<GestureArg>,
    },

    /// Print the effective configuration.
    Config,
}
