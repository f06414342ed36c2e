mod batch;
mod color;
mod config;
mod date_resolver;
mod font;
mod render;
mod watermark;

pub use batch::{
    collect_candidates, output_dir_for, output_file_name, process_path, BatchReport, BatchStats,
    FileOutcome, IMAGE_EXTENSIONS,
};
pub use color::{parse_color, try_parse_color, ColorError, DEFAULT_COLOR};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use date_resolver::{parse_exif_datetime, resolve_capture_date, CaptureDate, DateSource};
pub use font::WatermarkFont;
pub use render::{add_watermark, composite_mask, draw_watermark};
pub use watermark::{Position, WatermarkSpec, DEFAULT_FONT_SIZE, MARGIN};
