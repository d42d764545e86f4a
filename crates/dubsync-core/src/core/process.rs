//! Cross-platform process spawning helpers.
//!
//! On Windows, spawning console binaries (ffmpeg) from a windowed front-end
//! makes a console window flash up for each clip decode. Every subprocess
//! the core starts goes through these helpers.

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a std process command.
pub fn configure_std_command(cmd: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// Apply platform-specific flags to a tokio process command.
///
/// Also makes the child die with its handle, so a timed-out or aborted
/// decode never leaves an orphaned ffmpeg behind.
pub fn configure_tokio_command(cmd: &mut tokio::process::Command) {
    cmd.kill_on_drop(true);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}
