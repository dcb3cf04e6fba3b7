//! Android Toolchain Bootstrap
//!
//! Handles the installation steps that prepare a CI runner for Android work:
//! - Base SDK and command-line tools
//! - License acceptance and license marker files
//! - Build tools, platform tools and platform packages
//! - Emulator, system image, NDK and CMake

pub mod base;
pub mod bootstrap;
pub mod downloader;
pub mod emulator;
pub mod env;
pub mod host;
pub mod licenses;
pub mod sdk_manager;

pub use base::BaseInstaller;
pub use bootstrap::{BootstrapFailure, BootstrapReport, BootstrapState, BootstrapStep, SdkBootstrapper};
pub use downloader::ToolchainDownloader;
pub use emulator::EmulatorInstaller;
pub use env::Environment;
pub use host::{Invocation, ProcessOutcome, SystemHost, ToolHost};
pub use licenses::{LicenseAcceptor, LicenseMarker};
pub use sdk_manager::{SdkComponent, SdkManager};

/// Default system image target
pub const DEFAULT_TARGET: &str = "default";

/// Default system image architecture
pub const DEFAULT_ARCH: &str = "x86";

/// System image targets the package manager publishes
pub const KNOWN_TARGETS: &[&str] = &["default", "google_apis", "google_apis_playstore"];

/// System image architectures the package manager publishes
pub const KNOWN_ARCHS: &[&str] = &["x86", "x86_64", "arm64-v8a", "armeabi-v7a"];
