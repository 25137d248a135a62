use std::{str::FromStr, sync::Arc};

use clap::Parser;
use futures::future::select_all;
use thiserror::Error;
use tokio::select;
use tracing::info;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use visitlog::{
    common::{
        config::{Config, ConfigError},
        events::{self, EventSystem},
        session::SessionState,
    },
    components::{
        bindings::{Context, InteractionBindings},
        eventlogger::EventLogger,
        pipeline::Pipeline,
        reader::TriggerReader,
    },
    platform::{headless::HeadlessPlatform, Platform},
};

#[derive(Error, Debug)]
enum ApplicationError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid log level: {0}")]
    LogLevel(String),
    #[error("tokio join error: {0}")]
    TokioJoin(#[from] tokio::task::JoinError),
    #[error("events error: {0}")]
    Events(#[from] events::Error),
}

fn init_logging(level: &str) -> Result<(), ApplicationError> {
    let level = tracing::Level::from_str(level)
        .map_err(|_| ApplicationError::LogLevel(level.to_string()))?;
    let filter = filter::Targets::new()
        .with_default(tracing::Level::WARN)
        .with_target("visitlog", level);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    Ok(())
}

async fn app() -> Result<(), ApplicationError> {
    let config = Config::parse();
    init_logging(&config.log_level)?;

    let settings = config.validate()?;
    info!(endpoint = %settings.endpoint, "configuration loaded");

    let mut event_system = EventSystem::new(64);

    let platform: Arc<dyn Platform> = Arc::new(HeadlessPlatform::new(config.environment()));
    let session = Arc::new(SessionState::new());
    let pipeline =
        Pipeline::from_settings(&settings, platform, session)?.with_bus(event_system.handle());
    let context = Arc::new(Context::new(Arc::new(pipeline), settings.microphone_window));

    let bindings = InteractionBindings::standard(context)
        .with_consent_timeout(settings.consent_timeout);
    let mut bindings = event_system.spawn(bindings);
    event_system.run(EventLogger::new());
    event_system.run(TriggerReader::stdin());

    let mut components = event_system.futures();
    loop {
        if components.is_empty() {
            return Ok(bindings.await??);
        }
        select! {
            result = &mut bindings => return Ok(result??),
            (result, index, rest) = select_all(components) => {
                result??;
                info!(component = index, "component finished");
                components = rest;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    match app().await {
        Ok(_) => info!("input closed, all events handled"),
        Err(e) => panic!("Error: {}", e),
    }
}
