//! Droidup - Android SDK bootstrapper for CI runners
//!
//! Brings `$ANDROID_SDK_ROOT` into a state where the requested SDK
//! platform, build tools, emulator, system image and optional NDK/CMake are
//! installed, licenses are accepted and the tool directories are on PATH for
//! the rest of the job.
//!
//! ## Architecture
//!
//! - `droidup-core`: configuration, errors and CI workflow commands
//! - `droidup-android-toolchain`: downloads, sdkmanager and the bootstrap steps

#![warn(clippy::all)]

pub mod cli;
pub mod commands;

pub use droidup_android_toolchain as toolchain;
pub use droidup_core as core;

/// Prelude module for convenient imports
pub mod prelude {
    pub use droidup_android_toolchain::{Environment, SdkBootstrapper, SystemHost, ToolHost};
    pub use droidup_core::{InstallRequest, RunnerSettings};
}
