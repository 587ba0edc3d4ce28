use engine::{
    load_kind_catalog, resolve_app_paths, ContentCompileError, LoopConfig, Scene, SceneWorld,
    StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameplayConfig, GameplayConfigError, JsonLayoutStore};

const SEED_ENV_VAR: &str = "HOMESTEAD_SEED";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) world: SceneWorld,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error(transparent)]
    Config(#[from] GameplayConfigError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    info!("=== Homestead Startup ===");

    let paths = resolve_app_paths()?;
    let catalog = load_kind_catalog(&paths)?;
    let mut gameplay_config = GameplayConfig::load_or_default(&paths.gameplay_config_path())?;
    if let Some(seed) = seed_from_env() {
        gameplay_config.seed = seed;
    }
    info!(
        root = %paths.root.display(),
        seed = gameplay_config.seed,
        world_half_size = gameplay_config.world_half_size,
        "gameplay_configured"
    );

    let store = JsonLayoutStore::new(paths.layouts_dir.clone());
    let scene = gameplay::build_scene(gameplay_config, Box::new(store));

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene,
        world: SceneWorld::new(catalog),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn seed_from_env() -> Option<u64> {
    let raw = std::env::var(SEED_ENV_VAR).ok()?;
    match parse_seed(&raw) {
        Some(seed) => Some(seed),
        None => {
            warn!(var = SEED_ENV_VAR, value = %raw, "seed_env_ignored");
            None
        }
    }
}

fn parse_seed(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_parsing_trims_and_rejects_garbage() {
        assert_eq!(parse_seed(" 42 "), Some(42));
        assert_eq!(parse_seed("0"), Some(0));
        assert_eq!(parse_seed("-1"), None);
        assert_eq!(parse_seed("forty"), None);
        assert_eq!(parse_seed(""), None);
    }
}
