//! Application configuration.

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Fallback window width when no monitor can be queried.
    pub width: u32,
    /// Fallback window height when no monitor can be queried.
    pub height: u32,
    /// Start in borderless fullscreen.
    pub fullscreen: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Glint".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            validation: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the fallback window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable fullscreen.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// Whether the `FULLSCREEN` environment variable requests fullscreen.
pub fn fullscreen_from_env() -> bool {
    std::env::var("FULLSCREEN").as_deref() == Ok("1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_override_defaults() {
        let config = AppConfig::new("Test")
            .with_size(640, 480)
            .with_fullscreen(true)
            .with_validation(false);
        assert_eq!(config.title, "Test");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(config.fullscreen);
        assert!(!config.validation);
    }

    #[test]
    fn fullscreen_env_var_must_be_exactly_one() {
        std::env::remove_var("FULLSCREEN");
        assert!(!fullscreen_from_env());

        std::env::set_var("FULLSCREEN", "0");
        assert!(!fullscreen_from_env());

        std::env::set_var("FULLSCREEN", "1");
        assert!(fullscreen_from_env());

        std::env::remove_var("FULLSCREEN");
    }
}
