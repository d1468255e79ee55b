// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Anchor-relative placement for compositing.

use flowery_core::{Anchor, HorizontalAlign, VerticalAlign};

/// Translate a reference point into the top-left offset at which content of
/// `size` must be placed so that its `anchor` lands on `point`.
///
/// Middle alignment subtracts half the extent, truncated towards zero.
pub fn resolve_position(size: (u32, u32), point: (i64, i64), anchor: Anchor) -> (i64, i64) {
    let (width, height) = (i64::from(size.0), i64::from(size.1));
    let (x, y) = point;

    let x = match anchor.horizontal() {
        HorizontalAlign::Left => x,
        HorizontalAlign::Middle => x - width / 2,
        HorizontalAlign::Right => x - width,
    };
    let y = match anchor.vertical() {
        VerticalAlign::Top => y,
        VerticalAlign::Middle => y - height / 2,
        VerticalAlign::Bottom => y - height,
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: [(u32, u32); 4] = [(1, 1), (10, 7), (3, 20), (255, 128)];
    const POINTS: [(i64, i64); 4] = [(0, 0), (5, 9), (-4, 12), (100, -30)];

    #[test]
    fn left_top_is_identity() {
        for size in SIZES {
            for point in POINTS {
                assert_eq!(resolve_position(size, point, Anchor::LeftTop), point);
            }
        }
    }

    #[test]
    fn right_bottom_subtracts_full_size() {
        for (w, h) in SIZES {
            for (x, y) in POINTS {
                assert_eq!(
                    resolve_position((w, h), (x, y), Anchor::RightBottom),
                    (x - i64::from(w), y - i64::from(h))
                );
            }
        }
    }

    #[test]
    fn middle_middle_truncates_half() {
        assert_eq!(resolve_position((10, 7), (50, 50), Anchor::MiddleMiddle), (45, 47));
        assert_eq!(resolve_position((1, 1), (0, 0), Anchor::MiddleMiddle), (0, 0));
        assert_eq!(resolve_position((3, 5), (0, 0), Anchor::MiddleMiddle), (-1, -2));
    }

    #[test]
    fn mixed_anchors() {
        let size = (10, 20);
        assert_eq!(resolve_position(size, (100, 100), Anchor::LeftBottom), (100, 80));
        assert_eq!(resolve_position(size, (100, 100), Anchor::RightTop), (90, 100));
        assert_eq!(resolve_position(size, (100, 100), Anchor::MiddleBottom), (95, 80));
        assert_eq!(resolve_position(size, (100, 100), Anchor::RightMiddle), (90, 90));
        assert_eq!(resolve_position(size, (100, 100), Anchor::LeftMiddle), (100, 90));
        assert_eq!(resolve_position(size, (100, 100), Anchor::MiddleTop), (95, 100));
    }
}
