//! Plan invariants checked over a batch of generated requests.

use glass_optimizer_core::optimizer::{check_plate, replay_cuts};
use glass_optimizer_core::{
    optimize, transform_result, CutRequest, OptimizationContext, OptimizationResult,
    OptimizeOptions, PlateOrientation, StepNumbering,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Whole centimetres in `lo..=hi`.
fn cm(rng: &mut SmallRng, lo: u32, hi: u32) -> f64 {
    rng.random_range(lo..=hi) as f64
}

fn random_cuts(rng: &mut SmallRng, plate_width: f64, plate_height: f64) -> Vec<CutRequest> {
    let kinds: usize = rng.random_range(1..=6);
    (0..kinds)
        .map(|i| {
            let width = cm(rng, 5, plate_width as u32);
            let height = cm(rng, 5, plate_height as u32);
            let quantity: u32 = rng.random_range(1..=5);
            CutRequest::new(format!("cut{}", i), width, height, quantity)
        })
        .collect()
}

fn assert_invariants(cuts: &[CutRequest], plan: &OptimizationResult, allow_rotation: bool) {
    // tiling and guillotine replay
    for plate in &plan.plates {
        let violations = check_plate(plate);
        assert!(violations.is_empty(), "{}: {:?}", plan.strategy.name, violations);

        let plate_cuts = plan
            .instructions
            .iter()
            .filter(|c| c.plate_number == plate.plate_number);
        if let Err(detail) = replay_cuts(plate, plate_cuts) {
            panic!("{}: plate {}: {}", plan.strategy.name, plate.plate_number, detail);
        }
    }

    // conservation
    let mut placed: HashMap<&str, u32> = HashMap::new();
    for piece in plan.plates.iter().flat_map(|p| &p.pieces) {
        *placed.entry(piece.request_id.as_str()).or_default() += 1;
    }
    for cut in cuts {
        assert_eq!(placed.get(cut.id.as_str()).copied(), Some(cut.quantity));
    }

    // rotation
    let requested: HashMap<&str, &CutRequest> = cuts.iter().map(|c| (c.id.as_str(), c)).collect();
    for piece in plan.plates.iter().flat_map(|p| &p.pieces) {
        let cut = requested[piece.request_id.as_str()];
        if piece.rotated {
            assert!(allow_rotation);
            assert_eq!((piece.width, piece.height), (cut.height, cut.width));
        } else {
            assert_eq!((piece.width, piece.height), (cut.width, cut.height));
        }
    }

    // every piece is released by exactly one cut, unless it is the whole plate
    let mut released: HashMap<&str, usize> = HashMap::new();
    for cut in &plan.instructions {
        for piece in &cut.resulting_pieces {
            *released.entry(piece.piece_id.as_str()).or_default() += 1;
        }
    }
    for plate in &plan.plates {
        for piece in &plate.pieces {
            let whole_plate = plate.pieces.len() == 1
                && piece.width == plate.width
                && piece.height == plate.height;
            let expected = if whole_plate { None } else { Some(&1) };
            assert_eq!(released.get(piece.id.as_str()), expected, "{}", piece.id);
        }
    }
}

#[test]
fn generated_requests_keep_invariants() {
    let mut rng = SmallRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);
    let contexts = [
        OptimizationContext::Production,
        OptimizationContext::ExpensiveMaterial,
        OptimizationContext::QuickCut,
        OptimizationContext::Balanced,
    ];

    for round in 0..40 {
        let (plate_width, plate_height) = (cm(&mut rng, 60, 320), cm(&mut rng, 60, 240));
        let cuts = random_cuts(&mut rng, plate_width, plate_height);
        let options = OptimizeOptions {
            context: contexts[round % contexts.len()],
            allow_rotation: round % 3 != 0,
            ..OptimizeOptions::default()
        };
        let allow_rotation = options.allow_rotation;

        let result = optimize(&cuts, plate_width, plate_height, options).unwrap();
        assert!(result.validation.is_valid, "{:?}", result.validation.errors);

        for plan in std::iter::once(&result.primary).chain(&result.alternatives) {
            assert_invariants(&cuts, plan, allow_rotation);
        }
    }
}

#[test]
fn profile_and_plate_count_are_deterministic() {
    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..10 {
        let cuts = random_cuts(&mut rng, 260.0, 180.0);
        let first = optimize(&cuts, 260.0, 180.0, OptimizeOptions::default()).unwrap();
        let second = optimize(&cuts, 260.0, 180.0, OptimizeOptions::default()).unwrap();

        assert_eq!(first.profile, second.profile);
        assert_eq!(first.primary.total_plates, second.primary.total_plates);
        assert_eq!(first.primary.strategy, second.primary.strategy);
    }
}

#[test]
fn per_plate_numbering_restarts_at_one() {
    let cuts = vec![
        CutRequest::new("a", 120.0, 90.0, 3),
        CutRequest::new("b", 40.0, 40.0, 5),
    ];
    let options = OptimizeOptions {
        step_numbering: StepNumbering::PerPlate,
        ..OptimizeOptions::default()
    };
    let result = optimize(&cuts, 150.0, 100.0, options).unwrap();

    for plate in &result.primary.plates {
        let steps: Vec<u32> = result
            .primary
            .instructions
            .iter()
            .filter(|c| c.plate_number == plate.plate_number)
            .map(|c| c.step)
            .collect();
        let expected: Vec<u32> = (1..=steps.len() as u32).collect();
        assert_eq!(steps, expected);
    }
}

#[test]
fn orientation_only_changes_presentation() {
    let cuts = vec![
        CutRequest::new("a", 70.0, 40.0, 3),
        CutRequest::new("b", 35.0, 90.0, 2),
    ];
    let result = optimize(&cuts, 200.0, 150.0, OptimizeOptions::default()).unwrap();

    for orientation in PlateOrientation::ALL {
        let shown = transform_result(&result.primary, orientation);
        assert_eq!(shown.total_plates, result.primary.total_plates);
        assert_eq!(shown.total_guillotine_cuts, result.primary.total_guillotine_cuts);

        // Mirrored layouts are still valid tilings of the same plate.
        for plate in &shown.plates {
            assert!(check_plate(plate).is_empty());
        }
    }
}
