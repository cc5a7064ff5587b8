use crate::error::AppError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Environment variable prefix shared by every binary in the workspace.
pub const ENV_PREFIX: &str = "APP";

/// Load settings from `<directory>/base.yaml`, overlaid by `APP_*` environment
/// variables (`APP_SERVER__PORT=9000` overrides `server.port`).
///
/// A `.env` file in the working directory is read first if present.
pub fn load_layered<T: DeserializeOwned>(directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        port: u16,
    }

    #[test]
    fn test_load_layered_reads_base_file() {
        let dir = std::env::temp_dir().join(format!("meditation-core-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("base.yaml"), "name: sample\nport: 8123\n").unwrap();

        let loaded: Sample = load_layered(&dir).unwrap();
        assert_eq!(loaded.name, "sample");
        assert_eq!(loaded.port, 8123);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_layered_missing_file_is_config_error() {
        let dir = std::env::temp_dir().join(format!("meditation-core-{}", uuid::Uuid::new_v4()));
        let result: Result<Sample, AppError> = load_layered(&dir);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
