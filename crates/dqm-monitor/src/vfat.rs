//! Strip → VFAT bucket mapping for GEM chambers.

/// VFAT index of strip `x` in a roll whose strips span `[min, max]`.
///
/// The strip range is cut into three equal thirds; the first third maps to
/// `8 - roll`, the second to `16 - roll`, the rest to `24 - roll`. `min` and
/// `max` may come in either order. Strips outside the range fall into the
/// nearest end third.
pub fn vfat_bucket(min: f64, max: f64, x: f64, roll: i32) -> i32 {
    let step = (max - min).abs() / 3.0;
    let lo = min.min(max);
    if x < lo + step {
        8 - roll
    } else if x < lo + 2.0 * step {
        16 - roll
    } else {
        24 - roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_boundaries_are_lower_inclusive() {
        assert_eq!(vfat_bucket(0.0, 24.0, 7.999, 0), 8);
        assert_eq!(vfat_bucket(0.0, 24.0, 8.0, 0), 16);
        assert_eq!(vfat_bucket(0.0, 24.0, 16.0, 0), 24);
        assert_eq!(vfat_bucket(0.0, 24.0, 24.0, 0), 24);
    }

    #[test]
    fn order_of_range_does_not_matter() {
        for x in [-5.0, 0.0, 3.0, 8.0, 12.0, 16.0, 23.0, 40.0] {
            assert_eq!(vfat_bucket(24.0, 0.0, x, 0), vfat_bucket(0.0, 24.0, x, 0));
        }
    }

    #[test]
    fn out_of_range_clamps_to_end_thirds() {
        assert_eq!(vfat_bucket(1.0, 384.0, -100.0, 3), 5);
        assert_eq!(vfat_bucket(1.0, 384.0, 1000.0, 3), 21);
    }

    #[test]
    fn gem_rolls_cover_24_vfats() {
        let mut seen: Vec<i32> = (1..=8)
            .flat_map(|roll| [1.0, 200.0, 384.0].map(|s| vfat_bucket(1.0, 384.0, s, roll)))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, (0..24).collect::<Vec<_>>());
    }
}
