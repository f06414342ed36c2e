use crate::color::parse_color;
use crate::watermark::{Position, WatermarkSpec, DEFAULT_FONT_SIZE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub font_size: u32,
    pub color: String,
    pub position: String,
    pub font_paths: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: "white".to_string(),
            position: Position::default().keyword().to_string(),
            font_paths: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Builds the batch settings; invalid values degrade to defaults with a
    /// warning instead of failing.
    pub fn watermark_spec(&self) -> WatermarkSpec {
        let font_size = if self.font_size == 0 {
            warn!("font_size は1以上を指定してください。{} を使用します", DEFAULT_FONT_SIZE);
            DEFAULT_FONT_SIZE
        } else {
            self.font_size
        };

        let position = Position::from_keyword(&self.position);
        if !position.keyword().eq_ignore_ascii_case(self.position.trim()) {
            warn!(
                "未対応の位置です: '{}'。{} を使用します",
                self.position,
                position.keyword()
            );
        }

        WatermarkSpec {
            font_size,
            color: parse_color(&self.color),
            position,
            font_paths: self.font_paths.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "kelly", "date-watermark")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(&paths.config_path, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("設定ディレクトリを作成できませんでした: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(path, body)
        .with_context(|| format!("設定ファイルを書き込めませんでした: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("config.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.watermark_spec(), WatermarkSpec::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "color = \"#FF000080\"\nposition = \"center\"\n").expect("write");

        let spec = load_config_from(&path).expect("load").watermark_spec();
        assert_eq!(spec.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(spec.color, Rgba([255, 0, 0, 128]));
        assert_eq!(spec.position, Position::Center);
    }

    #[test]
    fn invalid_values_degrade_to_defaults() {
        let config = AppConfig {
            font_size: 0,
            color: "chartreuse".to_string(),
            position: "middle".to_string(),
            font_paths: Vec::new(),
        };
        let spec = config.watermark_spec();
        assert_eq!(spec.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(spec.color, Rgba([255, 255, 255, 255]));
        assert_eq!(spec.position, Position::BottomRight);
    }

    #[test]
    fn save_then_load_preserves_font_paths() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = AppConfig {
            font_paths: vec![PathBuf::from("/fonts/Custom.ttf")],
            ..AppConfig::default()
        };
        save_config_to(&path, &config).expect("save");
        assert_eq!(load_config_from(&path).expect("load"), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "font_size = \"big\"").expect("write");
        let err = load_config_from(&path).expect_err("type mismatch");
        assert!(err.to_string().contains("設定ファイルのパースに失敗しました"));
    }
}
