use crate::group::DisplayGroup;
use rand::Rng;
use serde::{Deserialize, Serialize};

const FALLBACK_GROUP_WIDTH: f64 = 400.0;
const FALLBACK_GROUP_HEIGHT: f64 = 300.0;
const FALLBACK_MEDIA_EDGE: f64 = 100.0;
const FALLBACK_MAX_ROTATION: f64 = 15.0;

/// Where a randomly placed item lands inside its group, in group-local pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomPosition {
	pub x: f64,
	pub y: f64,
	/// Degrees
	pub rotation: f64,
}

fn first_positive(candidates: &[f64], fallback: f64) -> f64 {
	candidates.iter().copied().find(|v| v.is_finite() && *v > 0.0).unwrap_or(fallback)
}

/// Picks a spot for one item so the media stays within the group bounds
pub fn random_position<R: Rng + ?Sized>(group: &DisplayGroup, rng: &mut R) -> RandomPosition {
	let size = &group.size;
	let group_width = first_positive(&[size.width, size.max_width], FALLBACK_GROUP_WIDTH);
	let group_height = first_positive(&[size.height, size.max_height], FALLBACK_GROUP_HEIGHT);
	let media_width = first_positive(&[size.media_width, size.max_width * 0.5], FALLBACK_MEDIA_EDGE);
	let media_height = first_positive(&[size.media_height, size.max_height * 0.5], FALLBACK_MEDIA_EDGE);

	let max_x = (group_width - media_width).max(0.0);
	let max_y = (group_height - media_height).max(0.0);

	let rotation = if group.random_settings.rotation_enabled {
		let max_rotation = first_positive(&[group.random_settings.max_rotation], FALLBACK_MAX_ROTATION);
		let raw = (rng.gen::<f64>() * 2.0 - 1.0) * max_rotation;
		(raw * 10.0).round() / 10.0
	} else {
		0.0
	};

	RandomPosition {
		x: (rng.gen::<f64>() * max_x).round(),
		y: (rng.gen::<f64>() * max_y).round(),
		rotation,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::group::Placement;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_position_stays_inside_group() {
		let mut group = DisplayGroup::new("g").with_placement(Placement::Random);
		group.size.width = 500.0;
		group.size.height = 400.0;
		group.size.media_width = 100.0;
		group.size.media_height = 50.0;
		let mut rng = StdRng::seed_from_u64(7);

		for _ in 0..200 {
			let pos = random_position(&group, &mut rng);
			assert!((0.0..=400.0).contains(&pos.x), "x out of range: {}", pos.x);
			assert!((0.0..=350.0).contains(&pos.y), "y out of range: {}", pos.y);
			assert_eq!(pos.x.fract(), 0.0);
			assert_eq!(pos.rotation, 0.0);
		}
	}

	#[test]
	fn test_media_larger_than_group_pins_to_origin() {
		let mut group = DisplayGroup::new("g");
		group.size.width = 50.0;
		group.size.height = 50.0;
		group.size.media_width = 200.0;
		group.size.media_height = 200.0;

		let pos = random_position(&group, &mut StdRng::seed_from_u64(1));
		assert_eq!((pos.x, pos.y), (0.0, 0.0));
	}

	#[test]
	fn test_rotation_is_bounded_and_rounded() {
		let mut group = DisplayGroup::new("g");
		group.random_settings.rotation_enabled = true;
		group.random_settings.max_rotation = 10.0;
		let mut rng = StdRng::seed_from_u64(42);

		for _ in 0..200 {
			let rotation = random_position(&group, &mut rng).rotation;
			assert!((-10.0..=10.0).contains(&rotation));
			assert!(((rotation * 10.0).round() - rotation * 10.0).abs() < 1e-9);
		}
	}
}
