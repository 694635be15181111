use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod hashing;
pub mod level;
pub mod sim;

pub use app::{
    draw_frame, run_app, run_app_with_metrics, tile_color, AppError, InputAction, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Renderer, SLOW_FRAME_ENV_VAR,
};
pub use level::{build_world, load_level_file, parse_level_json, LevelData, LevelError};
pub use sim::{
    step, Actor, EntityKind, Intents, Monster, RenderEntity, RenderFrame, StepPlan, Stepper,
    StepperConfig, TickEvent, TickReport, TileMap, TileMapError, Treasure, World, WorldStats,
};

pub const ROOT_ENV_VAR: &str = "TILEHOP_ROOT";
pub const LEVEL_ENV_VAR: &str = "TILEHOP_LEVEL";

const DEFAULT_LEVEL_FILE: &str = "level.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub level_path: PathBuf,
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
    #[error(
        "TILEHOP_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\tilehop\"\n\
Bash/zsh: export {env_var}=\"/path/to/tilehop\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let level_path = match read_optional_env(LEVEL_ENV_VAR)? {
        Some(value) => PathBuf::from(value),
        None => assets_dir.join(DEFAULT_LEVEL_FILE),
    };

    Ok(AppPaths {
        root,
        assets_dir,
        level_path,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match read_optional_env(ROOT_ENV_VAR)? {
        Some(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        None => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            find_repo_root(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
    }
}

fn read_optional_env(var: &'static str) -> Result<Option<String>, StartupError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn find_repo_root(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
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
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir(dir.path().join("assets")).expect("assets dir");
        assert!(!is_repo_marker(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir(dir.path().join("crates")).expect("crates dir");
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        let nested = dir.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested dir");

        let found = find_repo_root(&nested).expect("root");
        assert_eq!(found, normalize_path(dir.path()));
    }

    #[test]
    fn missing_root_marker_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("nested dir");

        // Ancestors of the temp dir may be real projects; only the subtree is under test.
        let found = find_repo_root(&nested);
        assert!(found.map_or(true, |root| !root.starts_with(normalize_path(dir.path()))));
    }
}
