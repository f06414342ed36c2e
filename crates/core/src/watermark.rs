use crate::color::DEFAULT_COLOR;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_FONT_SIZE: u32 = 30;
pub const MARGIN: i32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[cfg_attr(feature = "clap", value(name = "top_left"))]
    TopLeft,
    #[cfg_attr(feature = "clap", value(name = "top_right"))]
    TopRight,
    #[cfg_attr(feature = "clap", value(name = "bottom_left"))]
    BottomLeft,
    #[default]
    #[cfg_attr(feature = "clap", value(name = "bottom_right"))]
    BottomRight,
    #[cfg_attr(feature = "clap", value(name = "center"))]
    Center,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    /// Unknown keywords map to `BottomRight`.
    pub fn from_keyword(keyword: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.keyword().eq_ignore_ascii_case(keyword.trim()))
            .unwrap_or(Position::BottomRight)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Position::TopLeft => "top_left",
            Position::TopRight => "top_right",
            Position::BottomLeft => "bottom_left",
            Position::BottomRight => "bottom_right",
            Position::Center => "center",
        }
    }

    /// Draw origin for text of `text` size on an image of `image` size.
    pub fn origin(self, image: (u32, u32), text: (u32, u32)) -> (i32, i32) {
        let (img_w, img_h) = (image.0 as i32, image.1 as i32);
        let (text_w, text_h) = (text.0 as i32, text.1 as i32);
        let right = img_w - text_w - MARGIN;
        let bottom = img_h - text_h - MARGIN;

        match self {
            Position::TopLeft => (MARGIN, MARGIN),
            Position::TopRight => (right, MARGIN),
            Position::BottomLeft => (MARGIN, bottom),
            Position::BottomRight => (right, bottom),
            Position::Center => (
                (img_w - text_w).div_euclid(2),
                (img_h - text_h).div_euclid(2),
            ),
        }
    }
}

/// Settings shared read-only by every image of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub font_size: u32,
    pub color: Rgba<u8>,
    pub position: Position,
    pub font_paths: Vec<PathBuf>,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR,
            position: Position::default(),
            font_paths: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_follow_margin_rules() {
        let image = (640, 480);
        let text = (120, 30);
        assert_eq!(Position::TopLeft.origin(image, text), (10, 10));
        assert_eq!(Position::TopRight.origin(image, text), (510, 10));
        assert_eq!(Position::BottomLeft.origin(image, text), (10, 440));
        assert_eq!(Position::BottomRight.origin(image, text), (510, 440));
        assert_eq!(Position::Center.origin(image, text), (260, 225));
    }

    #[test]
    fn center_uses_floor_division() {
        assert_eq!(Position::Center.origin((101, 51), (10, 10)), (45, 20));
        assert_eq!(Position::Center.origin((10, 10), (13, 13)), (-2, -2));
    }

    #[test]
    fn oversized_text_goes_negative() {
        assert_eq!(Position::BottomRight.origin((50, 20), (80, 30)), (-40, -20));
    }

    #[test]
    fn keywords_round_trip_and_unknown_defaults_to_bottom_right() {
        for position in Position::ALL {
            assert_eq!(Position::from_keyword(position.keyword()), position);
        }
        assert_eq!(Position::from_keyword("CENTER"), Position::Center);
        assert_eq!(Position::from_keyword("middle"), Position::BottomRight);
        assert_eq!(Position::from_keyword(""), Position::BottomRight);
    }
}
