//! Post-detection selection: confidence floor, overlap suppression,
//! count limit.

use crate::types::Circle;

use super::params::FilterParams;

/// Select the final circle set.
///
/// Circles below the confidence floor are dropped, the rest sorted by
/// confidence descending and truncated to `max_circles`. Overlap
/// suppression then runs over that top slice: a circle whose center
/// lies closer than `overlap_threshold` times the smaller radius to an
/// already-accepted circle is rejected. A suppressed circle shortens
/// the result; it is never replaced by a lower-ranked one.
pub fn filter_circles(circles: &[Circle], params: &FilterParams) -> Vec<Circle> {
    let mut ranked: Vec<Circle> = circles
        .iter()
        .filter(|c| c.confidence >= params.min_confidence)
        .copied()
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(params.max_circles);

    let mut accepted: Vec<Circle> = Vec::new();
    for circle in ranked {
        let overlapping = accepted.iter().any(|kept| {
            let limit = params.overlap_threshold * circle.radius.min(kept.radius) as f32;
            circle.center_distance(kept) < limit
        });
        if !overlapping {
            accepted.push(circle);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn circle(x: i32, y: i32, r: i32, confidence: f32) -> Circle {
        Circle::new(x, y, r, confidence)
    }

    #[test]
    fn low_confidence_circles_are_dropped() {
        let circles = vec![
            circle(50, 50, 20, 0.9),
            circle(300, 50, 20, 0.2),
            circle(50, 300, 20, 0.35),
        ];
        let kept = filter_circles(&circles, &FilterParams::default());
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|c| c.confidence >= 0.3));
    }

    #[test]
    fn overlapping_keeps_the_more_confident() {
        let circles = vec![circle(50, 50, 20, 0.6), circle(55, 50, 20, 0.9)];
        let kept = filter_circles(&circles, &FilterParams::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[0].x, 55);
    }

    #[test]
    fn count_limit_applies_after_ranking() {
        let circles: Vec<Circle> = (0..15)
            .map(|i| circle(i * 100, 50, 20, 0.4 + i as f32 * 0.02))
            .collect();
        let kept = filter_circles(&circles, &FilterParams::default());
        assert_eq!(kept.len(), 10);
        // The weakest five fell off the end.
        assert!(kept.iter().all(|c| c.confidence >= 0.4 + 5.0 * 0.02 - 1e-6));
        for pair in kept.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn suppressed_circles_are_not_backfilled() {
        // Eleven circles clear the floor, the runner-up sitting on top
        // of the winner. The count limit keeps the top ten, then
        // suppression drops the runner-up; the eleventh stays out.
        let mut circles = vec![circle(50, 50, 20, 0.95), circle(55, 50, 20, 0.9)];
        for i in 0..9 {
            circles.push(circle(200 + i * 100, 50, 20, 0.8 - i as f32 * 0.05));
        }
        let kept = filter_circles(&circles, &FilterParams::default());
        assert_eq!(kept.len(), 9);
        assert!(kept.iter().all(|c| c.x != 1000), "eleventh-ranked circle crept in");
    }

    #[test]
    fn touching_but_distant_centers_both_survive() {
        // Distance 40 against a limit of 0.7 * 30 = 21.
        let circles = vec![circle(50, 50, 30, 0.8), circle(90, 50, 30, 0.7)];
        let kept = filter_circles(&circles, &FilterParams::default());
        assert_eq!(kept.len(), 2);
    }

    proptest! {
        #[test]
        fn accepted_set_is_pairwise_separated(
            coords in prop::collection::vec((0i32..500, 0i32..500, 5i32..60, 0.0f32..1.0), 0..25)
        ) {
            let circles: Vec<Circle> = coords
                .into_iter()
                .map(|(x, y, r, c)| circle(x, y, r, c))
                .collect();
            let params = FilterParams::default();
            let kept = filter_circles(&circles, &params);

            prop_assert!(kept.len() <= params.max_circles);
            for (i, a) in kept.iter().enumerate() {
                prop_assert!(a.confidence >= params.min_confidence);
                for b in kept.iter().skip(i + 1) {
                    let limit = params.overlap_threshold * a.radius.min(b.radius) as f32;
                    prop_assert!(
                        a.center_distance(b) >= limit,
                        "kept circles overlap: {:?} vs {:?}",
                        a,
                        b
                    );
                }
            }
        }
    }
}
