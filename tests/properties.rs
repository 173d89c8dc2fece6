use common::{layout, ImageInfo};
use gpu_unsharp::mask::{FilterMask, MaskExtent};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rgb_survives_rgba_round_trip(
        (width, height, rgb) in (1usize..24, 1usize..24).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), proptest::collection::vec(any::<u8>(), w * h * 3))
        })
    ) {
        let info = ImageInfo::new(width, height);
        let rgba = layout::to_rgba(&rgb, &info);

        prop_assert_eq!(rgba.len(), 4 * width * height);
        prop_assert!(rgba.chunks(4).all(|px| px[3] == 255));
        prop_assert_eq!(layout::to_rgb(&rgba, &info), rgb);
    }

    #[test]
    fn masks_are_normalized(half_extent in 0u32..12, spread in 0.05f32..20.0) {
        let mask = FilterMask::gaussian(MaskExtent::from_half_extent(half_extent).unwrap(), spread).unwrap();

        prop_assert_eq!(mask.weights().len(), mask.side() * mask.side());
        prop_assert!(mask.weights().iter().all(|w| w.is_finite() && *w >= 0.0));
        prop_assert!((mask.sum() - 1.0).abs() < 1e-5, "sum = {}", mask.sum());
    }

    #[test]
    fn nominal_radius_grows_quadratically(nominal in 0u32..16) {
        let extent = MaskExtent::from_nominal_radius(nominal).unwrap();
        prop_assert_eq!(extent.radius, nominal * nominal);
        prop_assert_eq!(extent.side() as u32, 2 * (nominal * nominal / 2) + 1);
    }
}
