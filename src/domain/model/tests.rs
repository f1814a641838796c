// Unit tests for domain models

use super::*;

#[test]
fn test_size_long_side() {
    assert_eq!(Size::new(1920, 1080).long_side(), 1920);
    assert_eq!(Size::new(1080, 1920).long_side(), 1920);
}

#[test]
fn test_size_display() {
    assert_eq!(Size::new(640, 360).to_string(), "640x360");
}

#[test]
fn test_dimension_from_signed() {
    assert_eq!(
        Dimension::from_signed(-1).unwrap(),
        Dimension::DeriveFromAspectRatio
    );
    assert_eq!(Dimension::from_signed(224).unwrap(), Dimension::Concrete(224));
    assert!(Dimension::from_signed(0).is_err());
    assert!(Dimension::from_signed(-2).is_err());
    assert!(Dimension::from_signed(i64::MAX).is_err());
}

#[test]
fn test_dimension_parse() {
    assert_eq!("auto".parse::<Dimension>().unwrap(), Dimension::DeriveFromAspectRatio);
    assert_eq!("-1".parse::<Dimension>().unwrap(), Dimension::DeriveFromAspectRatio);
    assert_eq!(" 640 ".parse::<Dimension>().unwrap(), Dimension::Concrete(640));
    assert!("wide".parse::<Dimension>().is_err());
}

#[test]
fn test_scale_request_constructors() {
    let request = ScaleRequest::with_height(224);
    assert!(request.width.is_derived());
    assert_eq!(request.height, Dimension::Concrete(224));
    assert_eq!(request.to_string(), "autox224");

    let request = ScaleRequest::from_signed(640, -1).unwrap();
    assert_eq!(request, ScaleRequest::with_width(640));
}

#[test]
fn test_quality_parse() {
    assert_eq!(Quality::parse("LOW").unwrap(), Quality::Low);
    assert_eq!("medium".parse::<Quality>().unwrap(), Quality::Medium);
    assert_eq!(Quality::High.to_string(), "high");
    assert!(Quality::parse("ultra").is_err());
}

#[test]
fn test_container_file_extension() {
    assert_eq!(Container::Mp4.file_extension(), "mp4");
    assert_eq!(Container::Mov.file_extension(), "mov");
    assert_eq!(Container::from_extension(".MOV"), Some(Container::Mov));
    assert_eq!(Container::from_extension("m4v"), Some(Container::Mp4));
    assert_eq!(Container::from_extension("avi"), None);
}

#[test]
fn test_compression_config_defaults() {
    let config = CompressionConfig::default();
    assert_eq!(config.fps, 24.0);
    assert_eq!(config.video_bitrate, 1_000_000);
    assert_eq!(config.max_keyframe_interval, 10);
    assert!(config.scale.is_none());
    assert_eq!(CompressionTarget::from(config).container(), Container::Mp4);
}

#[test]
fn test_frame_index_set_strided_membership() {
    let set = FrameIndexSet::strided(10, 3);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 3, 6]);
    assert!(set.retains(3));
    assert!(!set.retains(4));
    assert!(!set.retains(9));
    assert!(!set.retains(12));
    assert!(!set.keeps_every_frame());
}

#[test]
fn test_frame_index_set_membership_matches_iteration() {
    for (source, kept) in [(500, 300), (219, 175), (180, 3), (7, 1), (31, 30)] {
        let set = FrameIndexSet::strided(source, kept);
        let listed: Vec<u64> = set.iter().collect();
        let members: Vec<u64> = (0..source + 5).filter(|i| set.retains(*i)).collect();
        assert_eq!(listed, members, "{} of {}", kept, source);
    }
}

#[test]
fn test_frame_index_set_clamps_kept() {
    let set = FrameIndexSet::strided(4, 9);
    assert_eq!(set.len(), 4);
    assert!(set.keeps_every_frame());
}

#[test]
fn test_frame_index_set_all_keeps_overflow_frames() {
    let set = FrameIndexSet::all(4);
    assert_eq!(set.len(), 4);
    assert!(set.keeps_every_frame());
    assert!(set.retains(7));
}

#[test]
fn test_video_asset_estimated_frames() {
    let asset = VideoAsset {
        path: PathBuf::from("clip.mp4"),
        size: Size::new(1920, 1080),
        duration_secs: 10.0,
        frame_rate: 29.97,
        has_audio: true,
        video_bitrate: None,
        codec: "h264".to_string(),
        file_size: 0,
    };
    assert_eq!(asset.estimated_frame_count(), 300);
}
