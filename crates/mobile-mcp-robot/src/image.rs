//! Screenshot resizing and re-encoding
//!
//! Backends are tried in order: `sips` (macOS only), ImageMagick, then the
//! in-process `image` crate when enabled. A failing backend is logged and the
//! next one gets the same input.

use crate::error::{Result, RobotError};
use crate::exec::{CommandRunner, ExecOptions, args};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;

const SIPS_PATH: &str = "/usr/bin/sips";
const MAGICK: &str = "magick";

/// Target encoding of a transcoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
        }
    }

    fn quality(&self) -> u8 {
        match self {
            OutputFormat::Jpeg { quality } => *quality,
            OutputFormat::Png => crate::constants::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// sips only knows four quality levels
fn sips_quality(quality: u8) -> &'static str {
    match quality {
        90.. => "best",
        75..=89 => "high",
        50..=74 => "normal",
        _ => "low",
    }
}

fn is_imagemagick_banner(output: &[u8]) -> bool {
    String::from_utf8_lossy(output)
        .lines()
        .any(|line| line.contains("Version: ImageMagick"))
}

/// Image scaling through external tools, with an optional in-process fallback
#[derive(Clone)]
pub struct ImageTools {
    runner: Arc<dyn CommandRunner>,
    builtin: bool,
    sips: bool,
}

impl ImageTools {
    pub fn new(runner: Arc<dyn CommandRunner>, builtin: bool) -> Self {
        Self {
            runner,
            builtin,
            sips: cfg!(target_os = "macos"),
        }
    }

    async fn has_sips(&self) -> bool {
        self.sips
            && self
                .runner
                .run(SIPS_PATH, &args(["--version"]), &ExecOptions::silent())
                .await
                .is_ok()
    }

    async fn has_imagemagick(&self) -> bool {
        match self
            .runner
            .run(MAGICK, &args(["--version"]), &ExecOptions::default())
            .await
        {
            Ok(output) => is_imagemagick_banner(&output),
            Err(_) => false,
        }
    }

    /// Whether any backend can scale images
    pub async fn is_scaling_available(&self) -> bool {
        self.builtin || self.has_sips().await || self.has_imagemagick().await
    }

    /// Resize `png` to `width` (aspect ratio kept) and encode as `format`
    pub async fn transcode(&self, png: &[u8], width: u32, format: OutputFormat) -> Result<Vec<u8>> {
        if self.has_sips().await {
            match self.transcode_with_sips(png, width, format).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => tracing::debug!("sips failed, falling back to ImageMagick: {}", e),
            }
        }

        match self.transcode_with_imagemagick(png, width, format).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => tracing::debug!("ImageMagick failed: {}", e),
        }

        if self.builtin {
            let input = png.to_vec();
            let scaled = tokio::task::spawn_blocking(move || transcode_builtin(&input, width, format))
                .await
                .map_err(|e| RobotError::parse(format!("Image scaling task failed: {}", e)))?;
            match scaled {
                Ok(bytes) => return Ok(bytes),
                Err(e) => tracing::debug!("builtin image scaling failed: {}", e),
            }
        }

        Err(RobotError::parse(
            "Image scaling unavailable (requires Sips or ImageMagick).",
        ))
    }

    async fn transcode_with_sips(
        &self,
        png: &[u8],
        width: u32,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let dir = tempfile::Builder::new().prefix("image-").tempdir()?;
        let input = dir.path().join("input");
        let output = dir.path().join(format!("output.{}", format.extension()));
        tokio::fs::write(&input, png).await?;

        let mut sips_args = vec![
            "-s".to_string(),
            "format".to_string(),
            match format {
                OutputFormat::Jpeg { .. } => "jpeg",
                OutputFormat::Png => "png",
            }
            .to_string(),
        ];
        if let OutputFormat::Jpeg { quality } = format {
            sips_args.extend(args(["-s", "formatOptions", sips_quality(quality)]));
        }
        sips_args.extend(args(["-Z".to_string(), width.to_string()]));
        sips_args.extend(args([
            "--out".to_string(),
            output.display().to_string(),
            input.display().to_string(),
        ]));

        tracing::trace!("Running sips command: {} {}", SIPS_PATH, sips_args.join(" "));
        self.runner
            .run(SIPS_PATH, &sips_args, &ExecOptions::default())
            .await?;

        let bytes = tokio::fs::read(&output).await?;
        tracing::trace!("sips returned buffer of size: {}", bytes.len());
        Ok(bytes)
    }

    async fn transcode_with_imagemagick(
        &self,
        png: &[u8],
        width: u32,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let magick_args = args([
            "-".to_string(),
            "-resize".to_string(),
            format!("{}x", width),
            "-quality".to_string(),
            format.quality().to_string(),
            format!("{}:-", format.extension()),
        ]);
        tracing::trace!("Running magick command: {} {}", MAGICK, magick_args.join(" "));

        let bytes = self
            .runner
            .run(MAGICK, &magick_args, &ExecOptions::with_input(png))
            .await?;
        if bytes.is_empty() {
            return Err(RobotError::parse("ImageMagick produced no output"));
        }
        Ok(bytes)
    }
}

/// Decode, resize and re-encode in-process. Blocking.
fn transcode_builtin(png: &[u8], width: u32, format: OutputFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(png)?;
    let width = width.max(1);
    let height = if img.width() == 0 {
        img.height()
    } else {
        (u64::from(img.height()) * u64::from(width) / u64::from(img.width())).max(1) as u32
    };
    let resized = img.resize_exact(width, height, FilterType::Triangle);

    let mut buffer = Cursor::new(Vec::new());
    match format {
        OutputFormat::Jpeg { quality } => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            resized.to_rgb8().write_with_encoder(encoder)?;
        }
        OutputFormat::Png => resized.write_to(&mut buffer, ImageFormat::Png)?,
    }
    Ok(buffer.into_inner())
}
