mod common;

use common::synthetic_image::{disks_rgb, step_u8};

use circlesnap::detector::{CircleDetector, DetectionParams, FilterParams};
use circlesnap::edges::{EdgeDetectionParams, EdgeEngine};
use circlesnap::extract::{capture_circles, preview_image, CaptureOptions};
use circlesnap::filter_circles;
use circlesnap::pyramid::ImagePyramid;
use image::DynamicImage;

#[test]
fn detected_disks_survive_filtering_and_capture() {
    let _ = env_logger::builder().is_test(true).try_init();
    let image = disks_rgb(320, 200, &[(80, 100, 30), (230, 100, 30)]);

    let detector = CircleDetector::new(DetectionParams {
        min_radius: 15,
        max_radius: 50,
        min_dist: 60.0,
        param2: 25.0,
        ..DetectionParams::default()
    });
    let circles = detector.detect(&image).expect("detection succeeds");
    assert!(
        circles.len() >= 2,
        "expected both disks, got {} circles",
        circles.len()
    );

    let filter = FilterParams::default();
    let kept = filter_circles(&circles, &filter);
    assert!(
        (2..=filter.max_circles).contains(&kept.len()),
        "filter kept {} circles",
        kept.len()
    );
    for (i, a) in kept.iter().enumerate() {
        assert!(a.confidence >= filter.min_confidence);
        for b in kept.iter().skip(i + 1) {
            let limit = filter.overlap_threshold * a.radius.min(b.radius) as f32;
            assert!(
                a.center_distance(b) >= limit,
                "overlapping circles survived filtering"
            );
        }
    }

    let outcome = capture_circles(&image, &kept, detector.params(), &CaptureOptions::default())
        .expect("capture succeeds");
    assert_eq!(outcome.captures.len(), kept.len());
    assert_eq!(outcome.record.successful_captures, kept.len());
    assert!(outcome.captures[0].suggested_name.starts_with("circle_01_"));
    assert!(outcome.combined.is_some());

    // Cut-outs are opaque at the circle center, transparent at the corner.
    let first = &outcome.captures[0];
    let rgba = first.region.image.to_rgba8();
    let center = rgba.get_pixel(first.region.width() / 2, first.region.height() / 2);
    assert_eq!(center[3], 255);
    assert_eq!(rgba.get_pixel(0, 0)[3], 0);

    let json = outcome.record.to_json_string().expect("record serializes");
    assert!(json.contains("\"totalDetected\""));

    let preview = preview_image(&image, &kept);
    assert_eq!(preview.dimensions(), (320, 200));
}

#[test]
fn edge_results_feed_the_zoom_cache() {
    let _ = env_logger::builder().is_test(true).try_init();
    let step = step_u8(240, 160, 120, 30, 220);
    let image = DynamicImage::ImageLuma8(step);

    // The default 2x2 noise opening would strip the step's 1-px contour.
    let engine = EdgeEngine::new(EdgeDetectionParams {
        remove_noise: false,
        ..EdgeDetectionParams::default()
    });
    let result = engine.detect_edges(&image).expect("edge detection succeeds");
    assert!(result.edge_pixels > 0, "step edge produced no edge pixels");

    let again = engine.detect_edges(&image).expect("cache hit succeeds");
    assert_eq!(result.edge_pixels, again.edge_pixels);
    assert_eq!(engine.stats().cache_hits, 1);

    let mut pyramid = ImagePyramid::new(64.0);
    pyramid.set_base_image(DynamicImage::ImageLuma8(result.edges.clone()));
    let half = pyramid.image_at_zoom(0.5).expect("zoom level served");
    assert_eq!((half.width(), half.height()), (120, 80));
    let info = pyramid.memory_info();
    assert!(info.current_mb <= info.budget_mb);
}
