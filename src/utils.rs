use std::path::{Path, PathBuf};
use std::process::Command;
use std::env;

const APP_DIR_NAME: &str = "JoinJoyKrabi";
const CONFIG_FILE_NAME: &str = "krabi_map.ini";

/// Returns the cross-platform directory for application data.
///
/// The settings file lives here: `~/Library/Application Support` on macOS,
/// `%APPDATA%` on Windows, `$XDG_DATA_HOME` or `~/.local/share` elsewhere.
/// Keep this layout stable so existing `krabi_map.ini` files are found.
pub fn get_app_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push("Library");
        path.push("Application Support");
        path.push(APP_DIR_NAME);
        path
    } else if cfg!(target_os = "windows") {
        // %APPDATA%\JoinJoyKrabi, or next to the working directory
        match env::var("APPDATA") {
            Ok(appdata) => PathBuf::from(appdata).join(APP_DIR_NAME),
            Err(_) => PathBuf::from(".").join(APP_DIR_NAME),
        }
    } else if let Ok(xdg_data_home) = env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join(APP_DIR_NAME)
    } else {
        // ~/.local/share/JoinJoyKrabi
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push(".local");
        path.push("share");
        path.push(APP_DIR_NAME);
        path
    }
}

/// Ensures the directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<(), std::io::Error> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Returns the path to the application configuration file
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join(CONFIG_FILE_NAME)
}

/// Opens the specified URL in the default browser using native commands
pub fn open_browser(url: &str) -> Result<(), std::io::Error> {
    let os = env::consts::OS;
    match os {
        "macos" => {
            Command::new("open").arg(url).spawn()?;
        }
        "windows" => {
            Command::new("cmd").args(["/C", "start", url]).spawn()?;
        }
        "linux" => {
            Command::new("xdg-open").arg(url).spawn()?;
        }
        _ => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("Unsupported OS: {}", os),
            ));
        }
    }
    Ok(())
}
