// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Platform Implementation
//!
//! POSIX implementation backing [`Platform`](super::Platform) on Linux and
//! macOS, using `libc` and `/proc`/`sysconf` where available.

use super::{Platform, PlatformError};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Unix (POSIX) platform implementation.
pub struct UnixPlatform;

impl UnixPlatform {
    /// Creates a new Unix platform instance.
    pub fn new() -> Self {
        Self
    }

    fn sysconf(name: libc::c_int) -> Option<i64> {
        let value = unsafe { libc::sysconf(name) };
        if value < 0 {
            None
        } else {
            Some(value)
        }
    }

    fn read_mem_total_kb() -> Option<u64> {
        let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
        contents.lines().find_map(|line| {
            line.strip_prefix("MemTotal:")
                .and_then(|rest| rest.trim().strip_suffix(" kB"))
                .and_then(|kb| kb.trim().parse::<u64>().ok())
        })
    }

    fn read_mem_available_kb() -> Option<u64> {
        let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
        contents.lines().find_map(|line| {
            line.strip_prefix("MemAvailable:")
                .and_then(|rest| rest.trim().strip_suffix(" kB"))
                .and_then(|kb| kb.trim().parse::<u64>().ok())
        })
    }
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for UnixPlatform {
    fn page_size(&self) -> usize {
        Self::sysconf(libc::_SC_PAGESIZE).map(|v| v as usize).unwrap_or(4096)
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        Self::read_mem_total_kb()
            .map(|kb| kb * 1024)
            .ok_or_else(|| PlatformError::Other("could not read MemTotal from /proc/meminfo".to_string()))
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        Self::read_mem_available_kb()
            .map(|kb| kb * 1024)
            .ok_or_else(|| PlatformError::Other("could not read MemAvailable from /proc/meminfo".to_string()))
    }

    fn line_separator(&self) -> &'static str {
        "\n"
    }

    fn path_separator(&self) -> char {
        ':'
    }

    fn platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        }
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_elevated(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .map_err(PlatformError::Io)
    }

    fn is_executable(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError> {
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_platform_basics() {
        let platform = UnixPlatform::new();
        assert!(platform.cpu_count() >= 1);
        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);
    }

    #[test]
    fn test_unix_platform_constants() {
        let platform = UnixPlatform::new();
        assert_eq!(platform.line_separator(), "\n");
        assert_eq!(platform.path_separator(), ':');
    }

    #[test]
    fn test_temp_dir() {
        let platform = UnixPlatform::new();
        assert!(!platform.temp_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_is_executable_nonexistent_path() {
        let platform = UnixPlatform::new();
        assert!(!platform.is_executable(Path::new("/no/such/path/at/all")));
    }
}
