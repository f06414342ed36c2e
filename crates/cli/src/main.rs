use anyhow::Result;
use clap::{Parser, ValueEnum};
use date_watermark_core::{
    app_paths, load_config, process_path, save_config, AppConfig, BatchReport, Position,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "date-watermark")]
#[command(about = "撮影日を透かし文字として画像に書き込みます")]
struct Cli {
    /// 画像ファイル、または画像を含むフォルダ
    #[arg(required_unless_present_any = ["show_config", "save_config"])]
    path: Option<PathBuf>,
    /// 文字サイズ (px, 既定: 30)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    font_size: Option<u32>,
    /// 色名 (white, red, ...) または #RRGGBB / #RRGGBBAA (既定: white)
    #[arg(long)]
    color: Option<String>,
    /// 透かしの位置 (既定: bottom_right)
    #[arg(long, value_enum)]
    position: Option<Position>,
    /// 優先して使うフォントファイル (複数指定可)
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// 設定ファイルの場所と内容を表示して終了します
    #[arg(long, default_value_t = false)]
    show_config: bool,
    /// 指定したオプションを設定ファイルに保存します
    #[arg(long, default_value_t = false)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.output);

    if cli.show_config {
        return cmd_show_config();
    }

    let mut config = load_config()?;
    apply_overrides(&mut config, &cli);

    if cli.save_config {
        save_config(&config)?;
        let paths = app_paths()?;
        eprintln!("設定を保存しました: {}", paths.config_path.display());
    }

    let Some(path) = cli.path else {
        return Ok(());
    };

    let spec = config.watermark_spec();
    let report = process_path(&path, &spec)?;

    match cli.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            print_table(&report);
        }
    }

    Ok(())
}

/// Flags win over the config file; `--font` paths are tried before configured ones.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(font_size) = cli.font_size {
        config.font_size = font_size;
    }
    if let Some(color) = &cli.color {
        config.color = color.clone();
    }
    if let Some(position) = cli.position {
        config.position = position.keyword().to_string();
    }
    if !cli.fonts.is_empty() {
        let mut font_paths = cli.fonts.clone();
        font_paths.append(&mut config.font_paths);
        config.font_paths = font_paths;
    }
}

fn init_logging(output: OutputFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // JSON goes to stdout, so logs move out of its way.
    match output {
        OutputFormat::Json => builder.with_writer(std::io::stderr).init(),
        OutputFormat::Table => builder.init(),
    }
}

fn cmd_show_config() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn print_table(report: &BatchReport) {
    println!("元ファイル -> 出力ファイル (日付 / source)");
    for file in &report.files {
        match &file.error {
            None => println!(
                "{} -> {} ({} / {:?})",
                file.source.display(),
                file.output.display(),
                file.date,
                file.date_source
            ),
            Some(err) => println!("{} -> 失敗: {}", file.source.display(), err),
        }
    }

    println!(
        "\n集計: candidates={} succeeded={} failed={} font={}\n出力先: {}",
        report.stats.candidates,
        report.stats.succeeded,
        report.stats.failed,
        report.font,
        report.output_dir.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_flag_uses_snake_case_keywords() {
        let cli = Cli::try_parse_from(["date-watermark", "photos", "--position", "top_left"])
            .expect("parse");
        assert_eq!(cli.position, Some(Position::TopLeft));
        assert!(Cli::try_parse_from(["date-watermark", "photos", "--position", "top-left"]).is_err());
    }

    #[test]
    fn flags_override_config_and_fonts_go_first() {
        let cli = Cli::try_parse_from([
            "date-watermark",
            "photos",
            "--font-size",
            "48",
            "--color",
            "#FF000080",
            "--position",
            "center",
            "--font",
            "/fonts/A.ttf",
        ])
        .expect("parse");
        let mut config = AppConfig {
            font_paths: vec![PathBuf::from("/fonts/B.ttf")],
            ..AppConfig::default()
        };
        apply_overrides(&mut config, &cli);

        assert_eq!(config.font_size, 48);
        assert_eq!(config.color, "#FF000080");
        assert_eq!(config.position, "center");
        assert_eq!(
            config.font_paths,
            vec![PathBuf::from("/fonts/A.ttf"), PathBuf::from("/fonts/B.ttf")]
        );
    }

    #[test]
    fn save_config_does_not_require_a_path() {
        let cli = Cli::try_parse_from(["date-watermark", "--save-config", "--color", "red"])
            .expect("parse");
        assert!(cli.save_config);
        assert!(cli.path.is_none());
        assert!(Cli::try_parse_from(["date-watermark"]).is_err());
        assert!(Cli::try_parse_from(["date-watermark", "photos", "--font-size", "0"]).is_err());
    }
}
