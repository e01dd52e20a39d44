/// Operating system and machine architecture, as release assets name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// Detect the current platform
    pub fn detect() -> Self {
        Self::new(Self::detect_os(), Self::detect_arch())
    }

    fn detect_os() -> &'static str {
        #[cfg(target_os = "macos")]
        {
            "darwin"
        }
        #[cfg(target_os = "linux")]
        {
            "linux"
        }
        #[cfg(target_os = "windows")]
        {
            "windows"
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            std::env::consts::OS
        }
    }

    fn detect_arch() -> &'static str {
        #[cfg(target_arch = "x86_64")]
        {
            "x86_64"
        }
        #[cfg(target_arch = "aarch64")]
        {
            "aarch64"
        }
        #[cfg(target_arch = "x86")]
        {
            "i686"
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "x86")))]
        {
            std::env::consts::ARCH
        }
    }

    /// Lower-cased OS name.
    pub fn release_os(&self) -> String {
        self.os.to_lowercase()
    }

    /// Machine name mapped to the spelling used in release file names.
    pub fn release_arch(&self) -> String {
        release_arch(&self.arch)
    }
}

/// `x86_64` → `amd64`, `aarch64` → `arm64`, `armv7l` → `armv7`, `armv6l` → `armv6`.
///
/// Names without a mapping pass through lower-cased.
pub fn release_arch(machine: &str) -> String {
    let machine = machine.to_lowercase();
    match machine.as_str() {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "armv7l" => "armv7".to_string(),
        "armv6l" => "armv6".to_string(),
        _ => machine,
    }
}
