//! ImageMagick backend: every resize is one `convert` invocation.
//!
//! | Mode | `convert` arguments |
//! |---|---|
//! | `Scale` | `SRC -scale WxH> DST` |
//! | `Resize` | `SRC -resize WxH> DST` |
//! | `CropResize` | `SRC -resize x(2H) -resize (2W)x< -resize 50% -gravity center -crop WxH+0+0 +repage DST` |
//!
//! `CropResize` first oversizes the image to twice the box on its short
//! side, halves it, then center-crops, which copes with odd aspect ratios.
//!
//! Arguments are passed straight to the process, never through a shell, so
//! paths with spaces or quotes need no escaping.

use super::backend::{BackendError, ResizeBackend};
use super::params::{ResizeMode, ResizeRequest};
use std::process::Command;
use tracing::debug;

/// Backend that shells out to ImageMagick.
#[derive(Debug, Clone)]
pub struct ConvertBackend {
    program: String,
}

impl ConvertBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ConvertBackend {
    fn default() -> Self {
        Self::new("convert")
    }
}

/// Build the `convert` argument list for a request.
pub fn convert_args(request: &ResizeRequest) -> Vec<String> {
    let source = request.source.to_string_lossy().to_string();
    let target = request.target.to_string_lossy().to_string();
    let geometry = request.geometry;

    let mut args = vec![source];
    match request.mode {
        ResizeMode::Scale => {
            args.extend(["-scale".to_string(), geometry.shrink_only()]);
        }
        ResizeMode::Resize => {
            args.extend(["-resize".to_string(), geometry.shrink_only()]);
        }
        ResizeMode::CropResize => {
            args.extend([
                "-resize".to_string(),
                format!("x{}", geometry.height * 2),
                "-resize".to_string(),
                format!("{}x<", geometry.width * 2),
                "-resize".to_string(),
                "50%".to_string(),
                "-gravity".to_string(),
                "center".to_string(),
                "-crop".to_string(),
                format!("{geometry}+0+0"),
                "+repage".to_string(),
            ]);
        }
    }
    args.push(target);
    args
}

/// Render a command line for diagnostics, quoting every non-switch argument.
fn display_command(program: &str, args: &[String]) -> String {
    let quoted: Vec<String> = args
        .iter()
        .map(|a| {
            if a.starts_with('-') || a.starts_with('+') {
                a.clone()
            } else {
                format!("\"{a}\"")
            }
        })
        .collect();
    format!("{} {}", program, quoted.join(" "))
}

impl ResizeBackend for ConvertBackend {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    fn resize(&self, request: &ResizeRequest) -> Result<(), BackendError> {
        let args = convert_args(request);
        let command = display_command(&self.program, &args);
        debug!("*** {command}");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| BackendError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Geometry;
    use std::path::PathBuf;

    fn request(mode: ResizeMode) -> ResizeRequest {
        ResizeRequest {
            mode,
            source: PathBuf::from("photos/my trip.jpg"),
            target: PathBuf::from("photos/tn/my trip_tn.jpg"),
            geometry: Geometry::new(133, 100),
        }
    }

    #[test]
    fn scale_args() {
        assert_eq!(
            convert_args(&request(ResizeMode::Scale)),
            vec![
                "photos/my trip.jpg",
                "-scale",
                "133x100>",
                "photos/tn/my trip_tn.jpg"
            ]
        );
    }

    #[test]
    fn resize_args() {
        let args = convert_args(&request(ResizeMode::Resize));
        assert_eq!(args[1], "-resize");
        assert_eq!(args[2], "133x100>");
    }

    #[test]
    fn crop_resize_oversizes_then_crops() {
        let args = convert_args(&request(ResizeMode::CropResize));
        assert_eq!(
            &args[1..12],
            &[
                "-resize", "x200", "-resize", "266x<", "-resize", "50%", "-gravity", "center",
                "-crop", "133x100+0+0", "+repage"
            ]
        );
        assert_eq!(args.last().unwrap(), "photos/tn/my trip_tn.jpg");
    }

    #[test]
    fn display_command_quotes_paths_only() {
        let args = convert_args(&request(ResizeMode::Scale));
        assert_eq!(
            display_command("convert", &args),
            "convert \"photos/my trip.jpg\" -scale \"133x100>\" \"photos/tn/my trip_tn.jpg\""
        );
    }

    #[test]
    #[cfg(unix)]
    fn non_zero_exit_is_command_failed() {
        // `false` ignores its arguments and exits 1.
        let backend = ConvertBackend::new("false");
        let err = backend.resize(&request(ResizeMode::Scale)).unwrap_err();
        match err {
            BackendError::CommandFailed {
                command, status, ..
            } => {
                assert!(command.starts_with("false "));
                assert!(!status.success());
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let backend = ConvertBackend::new("gall-no-such-converter");
        let err = backend.resize(&request(ResizeMode::Scale)).unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[test]
    #[ignore] // Requires ImageMagick
    fn convert_shrinks_a_real_image() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("src.png");
        image::RgbImage::new(400, 300).save(&source).unwrap();
        let target = tmp.path().join("out.png");

        ConvertBackend::default()
            .resize(&ResizeRequest {
                mode: ResizeMode::Resize,
                source,
                target: target.clone(),
                geometry: Geometry::new(100, 100),
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&target).unwrap(), (100, 75));
    }
}
