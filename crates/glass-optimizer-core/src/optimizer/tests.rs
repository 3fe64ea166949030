use super::*;
use crate::config::ProfileThresholds;

fn request(plate_width: f64, plate_height: f64, cuts: Vec<CutRequest>) -> OptimizationRequest {
    OptimizationRequest {
        plate_width,
        plate_height,
        cuts,
        options: OptimizeOptions::default(),
    }
}

fn piece(id: &str, x: f64, y: f64, width: f64, height: f64) -> PlacedPiece {
    PlacedPiece {
        id: id.to_string(),
        request_id: id.to_string(),
        x,
        y,
        width,
        height,
        rotated: false,
    }
}

fn instances(dims: &[(f64, f64)]) -> Vec<PieceInstance> {
    dims.iter()
        .enumerate()
        .map(|(i, &(width, height))| PieceInstance {
            id: format!("p{i}"),
            request_id: format!("p{i}"),
            width,
            height,
        })
        .collect()
}

fn assert_plan_is_sound(plan: &OptimizationResult) {
    for plate in &plan.plates {
        let violations = check_plate(plate);
        assert!(violations.is_empty(), "{:?}", violations);

        let cuts = plan
            .instructions
            .iter()
            .filter(|c| c.plate_number == plate.plate_number);
        assert_eq!(replay_cuts(plate, cuts), Ok(()));
    }
}

#[test]
fn test_exact_fit_uses_one_full_plate() {
    let optimizer =
        Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("A", 50.0, 50.0, 4)])).unwrap();
    let result = optimizer.optimize();

    assert_eq!(result.primary.total_plates, 1);
    assert!((result.primary.average_utilization - 100.0).abs() < 1e-9);
    assert!(result.primary.total_waste.abs() < 1e-9);
    assert!(result.primary.plates[0].waste_areas.is_empty());
    assert_eq!(result.primary.total_guillotine_cuts, 3);
    assert_eq!(result.profile.profile_type, ProfileType::Uniform);
    assert!(result.validation.is_valid, "{:?}", result.validation.errors);
    assert_eq!(result.metadata.confidence_level, ConfidenceLevel::High);
    assert_plan_is_sound(&result.primary);
}

#[test]
fn test_oversized_piece_is_rejected_with_its_id() {
    let err = Optimizer::new(request(260.0, 180.0, vec![CutRequest::new("X", 300.0, 50.0, 1)]))
        .err()
        .unwrap();

    match &err {
        OptimizerError::PieceExceedsPlate {
            plate_width,
            plate_height,
            pieces,
        } => {
            assert_eq!(*plate_width, 260.0);
            assert_eq!(*plate_height, 180.0);
            assert_eq!(pieces.len(), 1);
            assert_eq!(pieces[0].request_id, "X");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("'X' (300 × 50 cm)"));
}

#[test]
fn test_every_oversized_piece_is_reported() {
    let err = Optimizer::new(request(
        100.0,
        100.0,
        vec![
            CutRequest::new("ok", 50.0, 50.0, 1),
            CutRequest::new("wide", 150.0, 10.0, 1),
            CutRequest::new("huge", 120.0, 120.0, 2),
        ],
    ))
    .err()
    .unwrap();

    let OptimizerError::PieceExceedsPlate { pieces, .. } = err else {
        panic!("expected PieceExceedsPlate");
    };
    let ids: Vec<&str> = pieces.iter().map(|p| p.request_id.as_str()).collect();
    assert_eq!(ids, vec!["wide", "huge"]);
}

#[test]
fn test_forced_second_plate() {
    let optimizer =
        Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("B", 60.0, 60.0, 2)])).unwrap();
    let result = optimizer.optimize();

    assert_eq!(result.primary.total_plates, 2);
    assert_eq!(result.primary.plates.len(), 2);
    assert!(result.validation.is_valid, "{:?}", result.validation.errors);
    assert!(result
        .validation
        .warnings
        .iter()
        .any(|w| w.contains("Average utilization")));
    assert_plan_is_sound(&result.primary);
}

#[test]
fn test_large_leftover_is_reusable() {
    let optimizer =
        Optimizer::new(request(260.0, 180.0, vec![CutRequest::new("C", 100.0, 100.0, 1)])).unwrap();
    let result = optimizer.optimize();

    let quality = &result.primary.waste_quality;
    assert_eq!(quality.reusable_waste_pieces, 2);
    let largest = quality.largest_waste_piece.as_ref().unwrap();
    assert_eq!(largest.plate_number, 1);
    assert!((largest.area - 260.0 * 80.0).abs() < 1e-9);
    assert!(result
        .suggestions
        .iter()
        .any(|s| s.kind == SuggestionKind::WasteReuse));
}

#[test]
fn test_invalid_input_is_rejected() {
    let zero_plate = Optimizer::new(request(0.0, 100.0, vec![CutRequest::new("a", 1.0, 1.0, 1)]));
    assert!(matches!(zero_plate, Err(OptimizerError::InvalidInput(_))));

    let no_cuts = Optimizer::new(request(100.0, 100.0, vec![]));
    assert!(matches!(no_cuts, Err(OptimizerError::InvalidInput(_))));

    let zero_quantity =
        Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("a", 10.0, 10.0, 0)]));
    let Err(OptimizerError::InvalidInput(message)) = zero_quantity else {
        panic!("expected InvalidInput");
    };
    assert!(message.contains("'a'"));

    let duplicate = Optimizer::new(request(
        100.0,
        100.0,
        vec![
            CutRequest::new("a", 10.0, 10.0, 1),
            CutRequest::new("a", 20.0, 20.0, 1),
        ],
    ));
    assert!(matches!(duplicate, Err(OptimizerError::InvalidInput(_))));

    let negative = Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("n", -5.0, 10.0, 1)]));
    assert!(matches!(negative, Err(OptimizerError::InvalidInput(_))));
}

#[test]
fn test_mixed_request_keeps_every_invariant() {
    let cuts = vec![
        CutRequest::new("door", 80.0, 120.0, 2),
        CutRequest::new("window", 60.0, 45.0, 5),
        CutRequest::new("shelf", 90.0, 30.0, 4),
        CutRequest::new("tile", 25.0, 25.0, 6),
    ];
    let optimizer = Optimizer::new(request(260.0, 180.0, cuts.clone())).unwrap();
    let result = optimizer.optimize();

    assert!(result.validation.is_valid, "{:?}", result.validation.errors);
    for plan in std::iter::once(&result.primary).chain(&result.alternatives) {
        assert_plan_is_sound(plan);

        let expected: u32 = cuts.iter().map(|c| c.quantity).sum();
        assert_eq!(plan.total_pieces() as u32, expected);
        assert_eq!(plan.total_guillotine_cuts as usize, plan.instructions.len());

        for plate in &plan.plates {
            let covered: f64 =
                plate.used_area() + plate.waste_areas.iter().map(|w| w.area).sum::<f64>();
            assert!((covered - plate.area()).abs() < 1e-6);
            assert!((plate.utilization + plate.waste_percentage - 100.0).abs() < 1e-9);
        }
    }

    assert_eq!(result.alternatives.len(), result.alternative_scores.len());
    assert!(result.alternatives.len() <= result.metadata.strategies_evaluated);
    for score in &result.alternative_scores {
        assert!(score.total_score <= result.primary_score.total_score + 1e-9);
    }
}

#[test]
fn test_optimization_is_deterministic() {
    let cuts = vec![
        CutRequest::new("a", 70.0, 40.0, 3),
        CutRequest::new("b", 35.0, 90.0, 2),
        CutRequest::new("c", 120.0, 20.0, 2),
    ];
    let first = optimize(&cuts, 200.0, 150.0, OptimizeOptions::default()).unwrap();
    let second = optimize(&cuts, 200.0, 150.0, OptimizeOptions::default()).unwrap();

    assert_eq!(first.primary, second.primary);
    assert_eq!(first.alternatives, second.alternatives);
    assert_eq!(first.profile, second.profile);
    assert_eq!(first.primary_score, second.primary_score);
}

#[test]
fn test_rotation_is_used_when_needed() {
    let optimizer =
        Optimizer::new(request(100.0, 50.0, vec![CutRequest::new("tall", 50.0, 100.0, 1)])).unwrap();
    let result = optimizer.optimize();

    let placed = &result.primary.plates[0].pieces[0];
    assert!(placed.rotated);
    assert_eq!((placed.width, placed.height), (100.0, 50.0));
    assert!(result.validation.is_valid, "{:?}", result.validation.errors);
}

#[test]
fn test_rotation_disabled_keeps_orientation() {
    let mut req = request(
        200.0,
        100.0,
        vec![
            CutRequest::new("a", 30.0, 80.0, 3),
            CutRequest::new("b", 90.0, 20.0, 2),
        ],
    );
    req.options.allow_rotation = false;
    let result = Optimizer::new(req).unwrap().optimize();

    for plan in std::iter::once(&result.primary).chain(&result.alternatives) {
        assert!(plan.plates.iter().flat_map(|p| &p.pieces).all(|p| !p.rotated));
        assert!(plan.strategy.name.contains("NO_ROTATION"));
    }
    assert_eq!(result.metadata.strategies_evaluated, 3);
}

#[test]
fn test_rotation_disabled_rejects_piece_that_only_fits_turned() {
    let mut req = request(100.0, 50.0, vec![CutRequest::new("tall", 50.0, 100.0, 1)]);
    req.options.allow_rotation = false;
    assert!(matches!(
        Optimizer::new(req),
        Err(OptimizerError::PieceExceedsPlate { .. })
    ));
}

#[test]
fn test_step_numbering() {
    let cuts = vec![CutRequest::new("B", 60.0, 60.0, 2)];

    let global = optimize(&cuts, 100.0, 100.0, OptimizeOptions::default()).unwrap();
    let steps: Vec<u32> = global.primary.instructions.iter().map(|c| c.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);

    let options = OptimizeOptions {
        step_numbering: StepNumbering::PerPlate,
        ..OptimizeOptions::default()
    };
    let per_plate = optimize(&cuts, 100.0, 100.0, options).unwrap();
    let steps: Vec<(u32, u32)> = per_plate
        .primary
        .instructions
        .iter()
        .map(|c| (c.plate_number, c.step))
        .collect();
    assert_eq!(steps, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
}

#[test]
fn test_instructions_release_every_piece_once() {
    let plate = PlateOptimization {
        plate_number: 1,
        width: 100.0,
        height: 100.0,
        pieces: vec![piece("a", 0.0, 0.0, 50.0, 40.0), piece("b", 50.0, 0.0, 50.0, 30.0)],
        waste_areas: Vec::new(),
        utilization: 0.0,
        waste_percentage: 0.0,
    };

    let cuts = instructions(&plate);
    assert_eq!(cuts.len(), 3);

    assert_eq!(cuts[0].cut_type, CutType::Horizontal);
    assert_eq!((cuts[0].position, cuts[0].start, cuts[0].end), (40.0, 0.0, 100.0));
    assert!(cuts[0].resulting_pieces.is_empty());

    assert_eq!(cuts[1].cut_type, CutType::Vertical);
    assert_eq!((cuts[1].position, cuts[1].start, cuts[1].end), (50.0, 0.0, 40.0));
    assert_eq!(cuts[1].resulting_piece().unwrap().piece_id, "a");

    assert_eq!(cuts[2].cut_type, CutType::Horizontal);
    assert_eq!((cuts[2].position, cuts[2].start, cuts[2].end), (30.0, 50.0, 100.0));
    assert_eq!(cuts[2].resulting_piece().unwrap().piece_id, "b");
    assert_eq!(cuts[2].resulting_piece().unwrap().piece_number, 2);

    assert_eq!(
        cuts[0].description,
        "Plate 1: horizontal cut at y = 40.0 cm, from x = 0.0 to 100.0 cm"
    );
}

#[test]
fn test_waste_tiles_the_plate() {
    let pieces = vec![
        piece("a", 0.0, 0.0, 50.0, 40.0),
        piece("b", 50.0, 0.0, 30.0, 30.0),
        piece("c", 0.0, 40.0, 100.0, 20.0),
    ];
    let analysis = analyze(100.0, 100.0, &pieces, 2000.0);

    // under b, tail of shelf 1, remainder below shelf 2
    assert_eq!(analysis.waste_areas.len(), 3);
    let waste: f64 = analysis.waste_areas.iter().map(|w| w.area).sum();
    let used: f64 = pieces.iter().map(PlacedPiece::area).sum();
    assert!((waste + used - 10_000.0).abs() < 1e-9);
    assert!((analysis.utilization - 49.0).abs() < 1e-9);

    let reusable: Vec<_> = analysis.waste_areas.iter().filter(|w| w.reusable).collect();
    assert_eq!(reusable.len(), 1);
    assert_eq!(reusable[0].area, 4000.0);
}

#[test]
fn test_refinement_moves_sparse_plate_into_leftover() {
    let optimizer = Optimizer::new(request(
        100.0,
        100.0,
        vec![
            CutRequest::new("big", 100.0, 60.0, 1),
            CutRequest::new("small", 30.0, 30.0, 1),
        ],
    ))
    .unwrap();

    let plan = optimizer.assemble(
        vec![
            vec![piece("big", 0.0, 0.0, 100.0, 60.0)],
            vec![piece("small", 0.0, 0.0, 30.0, 30.0)],
        ],
        StrategyInfo {
            name: "BY_WIDTH_DESC".to_string(),
            description: String::new(),
        },
    );
    assert_eq!(plan.total_plates, 2);

    let refinement = optimizer.refine(&plan);
    let refined = refinement.plan.unwrap();
    assert_eq!(refined.total_plates, 1);
    assert_eq!(refined.strategy.name, "BY_WIDTH_DESC + REFINED");
    assert_eq!(refinement.iterations, 1);
    assert_plan_is_sound(&refined);

    let small = refined.plates[0]
        .pieces
        .iter()
        .find(|p| p.id == "small")
        .unwrap();
    assert_eq!((small.x, small.y), (0.0, 60.0));
    assert!(optimizer.validate(&refined).is_valid);
}

#[test]
fn test_refinement_without_gain_returns_nothing() {
    let optimizer =
        Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("B", 60.0, 60.0, 2)])).unwrap();
    let plans = optimizer.generate_plans();
    let refinement = optimizer.refine(&plans[0]);

    assert!(refinement.plan.is_none());
    assert_eq!(refinement.iterations, 1);
}

#[test]
fn test_refinement_respects_iteration_budget() {
    let mut config = OptimizerConfig::default();
    config.refinement.max_iterations = 0;
    let optimizer = Optimizer::with_config(
        request(
            100.0,
            100.0,
            vec![
                CutRequest::new("big", 100.0, 60.0, 1),
                CutRequest::new("small", 30.0, 30.0, 1),
            ],
        ),
        config,
    )
    .unwrap();

    let plan = optimizer.assemble(
        vec![
            vec![piece("big", 0.0, 0.0, 100.0, 60.0)],
            vec![piece("small", 0.0, 0.0, 30.0, 30.0)],
        ],
        StrategyInfo {
            name: "BY_AREA_DESC".to_string(),
            description: String::new(),
        },
    );
    let refinement = optimizer.refine(&plan);
    assert!(refinement.plan.is_none());
    assert_eq!(refinement.iterations, 0);
}

#[test]
fn test_validation_catches_missing_piece() {
    let optimizer = Optimizer::new(request(
        100.0,
        100.0,
        vec![CutRequest::new("a", 50.0, 50.0, 2)],
    ))
    .unwrap();
    let plan = optimizer.assemble(
        vec![vec![piece("a-1", 0.0, 0.0, 50.0, 50.0)]],
        StrategyInfo {
            name: "MANUAL".to_string(),
            description: String::new(),
        },
    );

    let report = optimizer.validate(&plan);
    assert!(!report.is_valid);
}

#[test]
fn test_profiles() {
    let plate_area = 260.0 * 180.0;
    let thresholds = ProfileThresholds::default();
    let uniform = instances(&[(50.0, 40.0); 6]);
    assert_eq!(
        classify(&uniform, plate_area, &thresholds).profile_type,
        ProfileType::Uniform
    );

    let many_small: Vec<(f64, f64)> = (0..25)
        .map(|i| if i % 2 == 0 { (10.0, 10.0) } else { (20.0, 20.0) })
        .collect();
    assert_eq!(
        classify(&instances(&many_small), plate_area, &thresholds).profile_type,
        ProfileType::ManySmall
    );

    let few_large = instances(&[(200.0, 150.0), (150.0, 100.0), (120.0, 100.0)]);
    assert_eq!(
        classify(&few_large, plate_area, &thresholds).profile_type,
        ProfileType::FewLarge
    );

    let mut dominant = vec![(200.0, 150.0)];
    dominant.extend([(10.0, 10.0); 9]);
    assert_eq!(
        classify(&instances(&dominant), plate_area, &thresholds).profile_type,
        ProfileType::LargeDominant
    );

    let mixed = instances(&[
        (10.0, 100.0),
        (20.0, 100.0),
        (30.0, 100.0),
        (40.0, 100.0),
        (50.0, 100.0),
        (60.0, 100.0),
    ]);
    let profile = classify(&mixed, plate_area, &thresholds);
    assert_eq!(profile.profile_type, ProfileType::Mixed);
    assert_eq!(profile.piece_count, 6);
    assert_eq!(profile.median_area, 3500.0);
}

#[test]
fn test_strategies_for_profile() {
    let with_rotation = Strategy::for_profile(ProfileType::Mixed, true);
    assert_eq!(with_rotation.len(), 7);
    assert_eq!(with_rotation[0].name(), "BY_HEIGHT_DESC");
    assert!(with_rotation
        .iter()
        .any(|s| s.rotation == RotationPolicy::PreferLandscape));

    let without = Strategy::for_profile(ProfileType::FewLarge, false);
    assert_eq!(without.len(), 3);
    assert_eq!(without[0].name(), "BY_AREA_DESC_NO_ROTATION");
    assert!(without.iter().all(|s| s.rotation == RotationPolicy::Disabled));
}

#[test]
fn test_context_changes_scores() {
    let cuts = vec![
        CutRequest::new("a", 70.0, 40.0, 3),
        CutRequest::new("b", 35.0, 90.0, 2),
    ];
    let plans = Optimizer::new(request(200.0, 150.0, cuts))
        .unwrap()
        .generate_plans();
    let config = OptimizerConfig::default();

    let quick = score(&plans[0], OptimizationContext::QuickCut, &config);
    let expensive = score(&plans[0], OptimizationContext::ExpensiveMaterial, &config);
    assert_eq!(quick.cut_score, expensive.cut_score);
    assert_eq!(quick.compactness_score, expensive.compactness_score);
    assert!((0.0..=100.0).contains(&quick.total_score));
    assert!((0.0..=100.0).contains(&expensive.total_score));

    let all = score_all(&plans, OptimizationContext::Balanced, &config);
    assert_eq!(all.len(), plans.len());
    assert!(all.windows(2).all(|w| w[0].confidence == w[1].confidence));
}

#[test]
fn test_ranked_plans_select() {
    let plan = |name: &str| {
        OptimizationResult::empty(StrategyInfo {
            name: name.to_string(),
            description: String::new(),
        })
    };
    let score = |total_score: f64| QualityScore {
        total_score,
        ..QualityScore::default()
    };
    let ranked = RankedPlans::new(
        vec![plan("a"), plan("b"), plan("c")],
        vec![score(90.0), score(80.0), score(70.0)],
    );

    let picked = ranked.select(2).unwrap();
    let names: Vec<&str> = picked.plans().iter().map(|p| p.strategy.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
    assert_eq!(picked.primary().unwrap().1.total_score, 70.0);
    assert_eq!(picked.alternatives().count(), 2);

    assert!(ranked.select(3).is_none());
    assert_eq!(ranked.plans()[0].strategy.name, "a");
}

#[test]
fn test_max_alternatives_caps_result() {
    let cuts = vec![
        CutRequest::new("door", 80.0, 120.0, 2),
        CutRequest::new("window", 60.0, 45.0, 5),
        CutRequest::new("shelf", 90.0, 30.0, 4),
    ];
    let options = OptimizeOptions {
        max_alternatives: 1,
        ..OptimizeOptions::default()
    };
    let result = optimize(&cuts, 260.0, 180.0, options).unwrap();
    assert!(result.alternatives.is_empty());
    assert!(result.alternative_scores.is_empty());
}

#[test]
fn test_insights_summarize_result() {
    let result = optimize(
        &[CutRequest::new("A", 50.0, 50.0, 4)],
        100.0,
        100.0,
        OptimizeOptions::default(),
    )
    .unwrap();

    let lines = insights(&result);
    assert!(lines[0].starts_with("1 plate(s) at 100.0% average utilization"));
    assert!(lines.iter().any(|l| l.contains("UNIFORM")));
}

#[test]
fn test_instance_ids_do_not_collide_with_cut_ids() {
    let cuts = vec![
        CutRequest::new("a", 40.0, 30.0, 2),
        CutRequest::new("a-1", 40.0, 30.0, 1),
    ];
    let result = optimize(&cuts, 260.0, 180.0, OptimizeOptions::default()).unwrap();
    assert!(result.validation.is_valid, "{:?}", result.validation.errors);

    let mut ids: Vec<&str> = result
        .primary
        .plates
        .iter()
        .flat_map(|p| &p.pieces)
        .map(|p| p.id.as_str())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a-1", "a-1.2", "a-2"]);

    let mut released: Vec<&str> = result
        .primary
        .instructions
        .iter()
        .flat_map(|c| &c.resulting_pieces)
        .map(|p| p.piece_id.as_str())
        .collect();
    released.sort_unstable();
    assert_eq!(released, ids);
    assert_plan_is_sound(&result.primary);
}

#[test]
fn test_degenerate_result_is_flagged_empty_plan() {
    let optimizer =
        Optimizer::new(request(100.0, 100.0, vec![CutRequest::new("A", 50.0, 50.0, 2)])).unwrap();
    let profile = classify(
        &optimizer.expand_pieces(),
        optimizer.plate_area(),
        &optimizer.config.profile,
    );

    let result = optimizer.degenerate_result(profile, 7, Instant::now());

    assert!(result.primary.plates.is_empty());
    assert_eq!(result.primary.total_plates, 0);
    assert!(result.primary.instructions.is_empty());
    assert!(result.alternatives.is_empty());
    assert!(!result.validation.is_valid);
    assert_eq!(
        result.validation.errors,
        vec![OptimizerError::ScoringDegenerate.to_string()]
    );
    assert_eq!(result.metadata.strategies_evaluated, 7);
    assert_eq!(result.metadata.feasible_strategies, 0);
    assert_eq!(result.metadata.confidence_level, ConfidenceLevel::Low);
    assert_eq!(
        insights(&result),
        vec!["No feasible cutting plan was found".to_string()]
    );
}

#[test]
fn test_small_alternative_cap_keeps_best_plan() {
    let cuts = vec![
        CutRequest::new("door", 80.0, 120.0, 2),
        CutRequest::new("window", 60.0, 45.0, 5),
        CutRequest::new("shelf", 90.0, 30.0, 4),
        CutRequest::new("strip", 150.0, 20.0, 3),
    ];
    let full = optimize(&cuts, 260.0, 180.0, OptimizeOptions::default()).unwrap();
    assert!(full.metadata.strategies_evaluated <= OptimizeOptions::default().max_alternatives);

    for context in [
        OptimizationContext::Production,
        OptimizationContext::ExpensiveMaterial,
        OptimizationContext::QuickCut,
        OptimizationContext::Balanced,
    ] {
        let wide = optimize(
            &cuts,
            260.0,
            180.0,
            OptimizeOptions {
                context,
                ..OptimizeOptions::default()
            },
        )
        .unwrap();
        let capped = optimize(
            &cuts,
            260.0,
            180.0,
            OptimizeOptions {
                context,
                max_alternatives: 1,
                ..OptimizeOptions::default()
            },
        )
        .unwrap();

        assert_eq!(capped.primary.strategy, wide.primary.strategy);
        assert_eq!(
            capped.primary_score.total_score,
            wide.primary_score.total_score
        );
    }
}
