use image::Rgba;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const PALETTE: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("色が指定されていません")]
    Empty,
    #[error("未対応の色名です: {0}")]
    UnknownName(String),
    #[error("HEXカラーは6桁または8桁で指定してください: {0}")]
    InvalidHexLength(String),
    #[error("HEXカラーに不正な文字が含まれています: {0}")]
    InvalidHexDigit(String),
}

/// Parses a palette name or `#RRGGBB` / `#RRGGBBAA` token, falling back to
/// opaque white with a warning.
pub fn parse_color(token: &str) -> Rgba<u8> {
    match try_parse_color(token) {
        Ok(color) => color,
        Err(err) => {
            warn!("色 '{}' を解析できませんでした ({}). 白を使用します", token, err);
            DEFAULT_COLOR
        }
    }
}

pub fn try_parse_color(token: &str) -> Result<Rgba<u8>, ColorError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some((_, rgba)) = PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
    {
        return Ok(Rgba(*rgba));
    }

    let Some(hex) = trimmed.strip_prefix('#') else {
        return Err(ColorError::UnknownName(token.to_string()));
    };

    if hex.len() != 6 && hex.len() != 8 {
        return Err(ColorError::InvalidHexLength(token.to_string()));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHexDigit(token.to_string()));
    }

    let channel = |index: usize| -> Result<u8, ColorError> {
        u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16)
            .map_err(|_| ColorError::InvalidHexDigit(token.to_string()))
    };

    let alpha = if hex.len() == 8 { channel(3)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(1)?, channel(2)?, alpha]))
}
