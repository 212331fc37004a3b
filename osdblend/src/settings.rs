use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ScaleFilter {
    #[default]
    Bilinear,
    Nearest,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Convert the overlay to the video colorspace in fixed tiles, skipping
    /// tiles with no marked slices. Faster for incremental updates, but
    /// forces chroma siting to center. Only takes effect when the chosen
    /// intermediate format is chroma-subsampled.
    pub scale_in_tiles: bool,
    /// Filter used when resizing pre-scaled RGBA bitmaps.
    pub rgba_scale_filter: ScaleFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            scale_in_tiles: true,
            rgba_scale_filter: ScaleFilter::default(),
        }
    }
}

impl Settings {
    pub fn config_builder() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(
            include_str!("settings_default.toml"),
            FileFormat::Toml,
        ))
    }

    pub fn from_config(config: &Config) -> Result<Settings, ConfigError> {
        Ok(Settings {
            scale_in_tiles: config.get("scale_in_tiles")?,
            rgba_scale_filter: config.get("rgba_scale_filter")?,
        })
    }
}
