// Maps model landmarks onto named keypoint records

use crate::models::pose::{
    keypoint_name, now_iso8601, ImageInfo, Keypoint, Landmark, PoseExtraction, PoseResult,
};

/// Build the response record for one inference call.
///
/// Keypoint ids follow the landmark order; slots past the name table are
/// labelled `UNKNOWN_<index>`.
pub fn build_pose_result(image_info: ImageInfo, landmarks: Option<&[Landmark]>) -> PoseResult {
    let keypoints: Vec<Keypoint> = landmarks
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(id, landmark)| Keypoint {
            id,
            name: keypoint_name(id),
            x: landmark.x,
            y: landmark.y,
            z: landmark.z,
            visibility: landmark.visibility,
        })
        .collect();

    PoseResult::Success(PoseExtraction {
        timestamp: now_iso8601(),
        image_info,
        pose_detected: !keypoints.is_empty(),
        keypoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::LANDMARK_COUNT;

    fn info() -> ImageInfo {
        ImageInfo { width: 640, height: 480, channels: 3 }
    }

    fn landmarks(count: usize) -> Vec<Landmark> {
        (0..count)
            .map(|i| Landmark::new(i as f32 / 100.0, 0.5, -0.1, 0.9))
            .collect()
    }

    #[test]
    fn test_full_pose_maps_every_slot() {
        let input = landmarks(LANDMARK_COUNT);
        let result = build_pose_result(info(), Some(&input));

        let PoseResult::Success(extraction) = result else {
            panic!("expected success");
        };
        assert!(extraction.pose_detected);
        assert_eq!(extraction.keypoints.len(), LANDMARK_COUNT);
        for (i, keypoint) in extraction.keypoints.iter().enumerate() {
            assert_eq!(keypoint.id, i);
            assert_eq!(keypoint.x, input[i].x);
        }
        assert_eq!(extraction.keypoints[0].name, "NOSE");
        assert_eq!(extraction.keypoints[32].name, "RIGHT_FOOT_INDEX");
    }

    #[test]
    fn test_no_pose_gives_empty_keypoints() {
        let result = build_pose_result(info(), None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pose_detected"], false);
        assert!(json["keypoints"].as_array().unwrap().is_empty());
        assert_eq!(json["image_info"]["height"], 480);
    }

    #[test]
    fn test_overflow_slots_are_labelled_unknown() {
        let input = landmarks(LANDMARK_COUNT + 2);
        let result = build_pose_result(info(), Some(&input));
        let keypoints = result.keypoints();
        assert_eq!(keypoints.len(), 35);
        assert_eq!(keypoints[33].name, "UNKNOWN_33");
        assert_eq!(keypoints[34].name, "UNKNOWN_34");
    }
}
