use std::path::PathBuf;

use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

use crate::LauncherError;
use crate::registry::LAUNCHER_KEY;
use crate::steam::Hive;

/// Returns the launcher install directory on Windows using the registry.
pub(crate) fn get_base_dir() -> Result<PathBuf, LauncherError> {
    let dir = read_hklm_string(LAUNCHER_KEY, "InstallDir").ok_or(LauncherError::NotFound)?;
    let path = PathBuf::from(dir);
    if !path.exists() {
        return Err(LauncherError::NotFound);
    }
    Ok(path)
}

fn open(hive: Hive, subkey: &str) -> Option<RegKey> {
    let root = match hive {
        Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
    };
    root.open_subkey(subkey).ok()
}

/// Reads a string value under `HKEY_LOCAL_MACHINE`.
pub(crate) fn read_hklm_string(subkey: &str, value: &str) -> Option<String> {
    read_string(Hive::LocalMachine, subkey, value)
}

pub(crate) fn read_string(hive: Hive, subkey: &str, value: &str) -> Option<String> {
    open(hive, subkey)?.get_value::<String, _>(value).ok()
}

pub(crate) fn read_dword(hive: Hive, subkey: &str, value: &str) -> Option<u32> {
    open(hive, subkey)?.get_value::<u32, _>(value).ok()
}
