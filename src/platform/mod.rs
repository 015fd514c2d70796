//! Platform backends for the [`Screen`](crate::perception::Screen) contract.

use anyhow::Result;

use crate::perception::Screen;

#[cfg(windows)]
pub mod windows;

/// Returns the native screen backend for this platform.
#[cfg(windows)]
pub fn native_screen() -> Result<Box<dyn Screen>> {
    Ok(Box::new(windows::NativeScreen::new()))
}

#[cfg(not(windows))]
pub fn native_screen() -> Result<Box<dyn Screen>> {
    Err(anyhow::anyhow!(
        "No screen backend for this platform; only the Windows client is supported"
    ))
}
