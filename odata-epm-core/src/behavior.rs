use serde::Deserialize;

/// Which family of consumers the payload is produced for or read by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum FormatBehavior {
    #[default]
    Default,
    WcfDataServicesClient,
    WcfDataServicesServer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReaderBehavior {
    #[serde(default)]
    pub format: FormatBehavior,
}

impl ReaderBehavior {
    pub fn new(format: FormatBehavior) -> Self {
        Self { format }
    }

    /// Mapped `updated`/`published` values echo the literal timestamp text
    /// instead of a reformatted timestamp.
    pub fn uses_string_timestamps(&self) -> bool {
        self.format == FormatBehavior::WcfDataServicesClient
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WriterBehavior {
    #[serde(default)]
    pub format: FormatBehavior,
    /// Legacy single-provider compatibility: primitives of complex types that
    /// some mapping keeps in content are always written in content.
    #[serde(default)]
    pub use_v1_provider_behavior: bool,
}

impl WriterBehavior {
    pub fn new(format: FormatBehavior) -> Self {
        Self {
            format,
            use_v1_provider_behavior: false,
        }
    }

    pub fn with_v1_provider_behavior(mut self, enabled: bool) -> Self {
        self.use_v1_provider_behavior = enabled;
        self
    }

    pub fn uses_string_timestamps(&self) -> bool {
        self.format == FormatBehavior::WcfDataServicesClient
    }
}
