// Skeleton overlay rendering for debugging detected poses

use crate::models::pose::{ExtractResult, Landmark, PoseError, POSE_CONNECTIONS};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::{Path, PathBuf};

/// Joint color (red)
pub const LANDMARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Bone color (light gray)
pub const CONNECTION_COLOR: Rgb<u8> = Rgb([224, 224, 224]);

/// Landmarks below this visibility are not drawn
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

const LINE_THICKNESS: i32 = 2;
const JOINT_RADIUS: i32 = 3;

/// Copy `image` and draw the skeleton described by `landmarks` on it
pub fn render_skeleton(image: &RgbImage, landmarks: &[Landmark]) -> RgbImage {
    let mut canvas = image.clone();
    let (width, height) = canvas.dimensions();

    let pixel = |index: usize| -> Option<(f32, f32)> {
        let landmark = landmarks.get(index)?;
        if !landmark.is_visible(VISIBILITY_THRESHOLD) {
            return None;
        }
        landmark.to_pixel(width, height)
    };

    for (start, end) in POSE_CONNECTIONS {
        if let (Some(a), Some(b)) = (pixel(start.index()), pixel(end.index())) {
            draw_thick_line(&mut canvas, a, b, CONNECTION_COLOR);
        }
    }

    for index in 0..landmarks.len() {
        if let Some((x, y)) = pixel(index) {
            draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), JOINT_RADIUS, LANDMARK_COLOR);
        }
    }

    canvas
}

fn draw_thick_line(canvas: &mut RgbImage, start: (f32, f32), end: (f32, f32), color: Rgb<u8>) {
    for dx in 0..LINE_THICKNESS {
        for dy in 0..LINE_THICKNESS {
            let offset = (dx as f32, dy as f32);
            draw_line_segment_mut(
                canvas,
                (start.0 + offset.0, start.1 + offset.1),
                (end.0 + offset.0, end.1 + offset.1),
                color,
            );
        }
    }
}

/// Write the overlay as JPEG
pub fn save_visualization(image: &RgbImage, output_path: &Path) -> ExtractResult<()> {
    image
        .save_with_format(output_path, ImageFormat::Jpeg)
        .map_err(|e| {
            PoseError::Visualization(format!("could not write {}: {}", output_path.display(), e))
        })
}

/// `pose_visualization_<stem>_<YYYYmmdd_HHMMSS>.jpg` next to the working directory
pub fn default_visualization_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("pose_visualization_{}_{}.jpg", stem, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::{BodyLandmark, LANDMARK_COUNT};

    fn standing_figure() -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 0.0); LANDMARK_COUNT];
        landmarks[BodyLandmark::LeftShoulder.index()] = Landmark::new(0.25, 0.25, 0.0, 0.9);
        landmarks[BodyLandmark::RightShoulder.index()] = Landmark::new(0.75, 0.25, 0.0, 0.9);
        landmarks
    }

    #[test]
    fn test_render_draws_visible_connections() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let rendered = render_skeleton(&image, &standing_figure());

        // Midpoint of the shoulder line
        assert_eq!(rendered.get_pixel(50, 25), &CONNECTION_COLOR);
        // Joint center
        assert_eq!(rendered.get_pixel(25, 25), &LANDMARK_COLOR);
        // Source image untouched
        assert_eq!(image.get_pixel(50, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_skips_low_visibility_points() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let rendered = render_skeleton(&image, &standing_figure());

        // Every other landmark sits at the center with zero visibility
        assert_eq!(rendered.get_pixel(50, 50), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_without_landmarks_is_a_copy() {
        let image = RgbImage::from_pixel(10, 10, Rgb([1, 2, 3]));
        assert_eq!(render_skeleton(&image, &[]), image);
    }

    #[test]
    fn test_save_visualization_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.jpg");
        let image = RgbImage::from_pixel(16, 16, Rgb([200, 100, 50]));

        save_visualization(&image, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_save_visualization_reports_write_failure() {
        let image = RgbImage::new(4, 4);
        let err = save_visualization(&image, Path::new("/nonexistent/dir/out.jpg")).unwrap_err();
        assert_eq!(err.kind(), "visualization");
    }

    #[test]
    fn test_default_visualization_path() {
        let path = default_visualization_path(Path::new("/tmp/photos/runner.png"));
        let name = path.to_string_lossy();
        assert!(name.starts_with("pose_visualization_runner_"));
        assert!(name.ends_with(".jpg"));
    }
}
