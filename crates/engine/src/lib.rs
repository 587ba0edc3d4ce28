use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    part_shapes, run_app, world_to_screen_px, wrap_angle, AnimalState, AppError, ContainerKind,
    Cosmetics, DoorRole, Entity, EntityContainer, EntityFactory, EntityId, EntityIdAllocator,
    EntityKind, FirstPersonCamera, InputAction, InputEvent, InputSnapshot, KindEntry,
    LightingState, LoopConfig, NodeDesc, NodeId, NodeLayer, NodeOwner, NodePart, Orientation,
    PartShape, RayHit, Renderer, Rgb, Scene, SceneCommand, SceneGraph, SceneWorld, ViewerPose,
    Viewport, WanderParams, DEFAULT_MAP_HALF_EXTENT, PITCH_LIMIT_RADIANS,
    ROCK_DISPLACEMENT_SAMPLES,
};
pub use content::{
    compile_kind_catalog, load_kind_catalog, Buildable, ContentCompileError, ContentErrorCode,
    FloatRange, KindCatalog, KindDef, SourceLocation, WanderDef,
};

pub const ROOT_ENV_VAR: &str = "HOMESTEAD_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub layouts_dir: PathBuf,
}

impl AppPaths {
    pub fn kind_catalog_path(&self) -> PathBuf {
        self.assets_dir.join("base").join("kinds.xml")
    }

    pub fn gameplay_config_path(&self) -> PathBuf {
        self.assets_dir.join("base").join("gameplay.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create layout directory at {path}: {source}")]
    CreateLayoutDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "HOMESTEAD_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/homestead\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_for_root(root)
}

pub fn app_paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let assets_dir = root.join("assets");
    let layouts_dir = root.join("saves").join("layouts");

    fs::create_dir_all(&layouts_dir).map_err(|source| StartupError::CreateLayoutDir {
        path: layouts_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        assets_dir,
        layouts_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("assets")).expect("assets");
        assert!(!is_repo_marker(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn app_paths_create_layout_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = app_paths_for_root(dir.path().to_path_buf()).expect("paths");

        assert!(paths.layouts_dir.is_dir());
        assert_eq!(
            paths.kind_catalog_path(),
            dir.path().join("assets").join("base").join("kinds.xml")
        );
    }
}
