mod cli;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use carscan::config::CarscanConfig;
use carscan::prediction::PredictionClient;
use carscan::remote::{PushRelayClient, RealtimeDbStore};
use carscan::services::{
    FileCamera, FilePicker, InMemoryImageStore, RemoteStore, RouteLog, Services, StaticAuth,
    TerminalBell,
};
use carscan::workflow::{Phase, PhotoSource, SubmitOutcome, Workflow, ZoomSensitivity, next_zoom};
use clap::Parser;
use cli::{Cli, Command};
use ui::ScanProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = CarscanConfig::load().context("failed to load carscan.toml")?;
    if let Some(uid) = cli.uid {
        config.user_uid = uid;
    }
    if let Some(platform) = cli.platform {
        config.platform = platform.into();
    }

    match cli.command {
        Command::Submit {
            photo,
            source,
            flash,
            front,
        } => submit(&config, photo, source.into(), flash, front).await,
        Command::Zoom { gestures } => {
            let sensitivity = ZoomSensitivity::for_platform(config.platform);
            let mut zoom = 0.0;
            let levels: Vec<f64> = gestures
                .iter()
                .map(|g| {
                    zoom = next_zoom(zoom, g.0, sensitivity);
                    zoom
                })
                .collect();
            ui::print_zoom_levels(&levels);
            Ok(())
        }
        Command::Config => {
            let shown = toml::to_string_pretty(&config.masked())
                .context("failed to render configuration")?;
            print!("{shown}");
            Ok(())
        }
    }
}

async fn submit(
    config: &CarscanConfig,
    photo: PathBuf,
    source: PhotoSource,
    flash: bool,
    front: bool,
) -> Result<()> {
    config.validate()?;
    let timeout = config.request_timeout();

    let predictor = PredictionClient::new(config.prediction_url.clone(), timeout)?;
    log::debug!("prediction endpoint {}", predictor.url());

    // Only reached for signed-in users, which `validate` ties to a database URL.
    let remote_store: Arc<dyn RemoteStore> =
        Arc::new(RealtimeDbStore::new(&config.database_url, timeout)?);
    let local_store = Arc::new(InMemoryImageStore::default());
    let navigator = Arc::new(RouteLog::default());

    let services = Services {
        camera: Arc::new(FileCamera::new(photo.clone())),
        picker: Arc::new(FilePicker::new(photo)),
        predictor: Arc::new(predictor),
        auth: Arc::new(StaticAuth::new(Some(config.user_uid.clone()))),
        remote_store,
        local_store: local_store.clone(),
        navigator: navigator.clone(),
        feedback: Arc::new(TerminalBell),
        push: Arc::new(PushRelayClient::new(Some(config.push_url.clone()), timeout)?),
    };

    let mut workflow = Workflow::new(services, config.workflow());
    if flash {
        workflow.toggle_flash();
    }
    if front {
        workflow.flip_camera();
    }

    let progress = ScanProgress::start();
    let captured = workflow.acquire_photo(source).await?;
    progress.reviewing(&captured, &workflow.camera_settings());

    progress.submitting();
    let outcome = workflow.submit().await;
    progress.outcome(&outcome, &config.results_route);

    match outcome {
        SubmitOutcome::Succeeded(result) => {
            workflow.complete_success_cue().await;
            log::debug!("phases: {:?}", workflow.history());
            progress.navigated(navigator.last().as_deref());
            ui::print_details(&result);
            ui::print_local_images(&local_store);
            Ok(())
        }
        SubmitOutcome::Failed(reason) => {
            if workflow.phase() == Phase::Failed {
                workflow.dismiss_failure()?;
            }
            bail!("submission failed: {reason}")
        }
        SubmitOutcome::Ignored => bail!("workflow was not reviewing a photo"),
    }
}
