//! API token storage in the OS keychain.

use crate::error::ApiError;

const SERVICE: &str = "timegrid";
const KEY: &str = "api-token";

/// Read the stored API token. Absent entry reads as `None`.
pub fn get() -> Result<Option<String>, ApiError> {
    let entry = keyring::Entry::new(SERVICE, KEY)?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store the API token, replacing any previous value.
pub fn set(token: &str) -> Result<(), ApiError> {
    let entry = keyring::Entry::new(SERVICE, KEY)?;
    entry.set_password(token)?;
    Ok(())
}

/// Delete the stored API token. Deleting an absent entry succeeds.
pub fn clear() -> Result<(), ApiError> {
    let entry = keyring::Entry::new(SERVICE, KEY)?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
