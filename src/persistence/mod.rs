use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::core::StudioError;

const APP_NAME: &str = "g2p-studio";

/// Per-user data directory for the studio, falling back to the working
/// directory on platforms without one.
pub fn get_app_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => {
            let app_dir = data_dir.join(APP_NAME);
            if let Err(e) = fs::create_dir_all(&app_dir) {
                warn!("Could not create {}: {}", app_dir.display(), e);
            }
            app_dir
        }
        None => PathBuf::from("."),
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn save_json<T: Serialize>(data: &T, filename: &str) -> Result<(), StudioError> {
    write_json_file(&get_data_file_path(filename), data)
}

/// Missing files read as `T::default()`; unreadable or malformed ones are errors.
pub fn load_json<T: DeserializeOwned + Default>(filename: &str) -> Result<T, StudioError> {
    read_json_file(&get_data_file_path(filename))
}

pub fn load_json_or_default<T: DeserializeOwned + Default>(filename: &str) -> T {
    load_json(filename).unwrap_or_else(|e| {
        warn!("Failed to load {}: {}. Using defaults.", filename, e);
        T::default()
    })
}

pub fn data_file_exists(filename: &str) -> bool {
    get_data_file_path(filename).exists()
}

fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), StudioError> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    info!("Saved {}", path.display());
    Ok(())
}

fn read_json_file<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StudioError> {
    if !path.exists() {
        debug!("{} not found, using defaults", path.display());
        return Ok(T::default());
    }
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_json_file_round_trip_and_missing_file() {
        let dir = std::env::temp_dir().join(format!("g2p-studio-persist-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("data.json");

        let missing: BTreeMap<String, u32> = read_json_file(&path).unwrap();
        assert!(missing.is_empty());

        let data = BTreeMap::from([("rules".to_string(), 3u32)]);
        write_json_file(&path, &data).unwrap();
        assert_eq!(read_json_file::<BTreeMap<String, u32>>(&path).unwrap(), data);

        fs::write(&path, "{not json").unwrap();
        assert!(read_json_file::<BTreeMap<String, u32>>(&path).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }
}
