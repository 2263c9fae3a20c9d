use std::sync::Arc;

use deep_research::testing::MockGenerator;
use deep_research::{DistillResult, ResearchError, ResultDistiller, SearchHit};

#[tokio::test]
async fn hits_without_content_are_left_out_of_the_prompt() {
    let generator = Arc::new(MockGenerator::new().on_distill(
        "solar glass",
        &["Float glass furnaces run at 1500C"],
        &[],
    ));
    let hits = vec![
        SearchHit::new("https://full.example", "Furnace temperatures explained"),
        SearchHit {
            url: Some("https://none.example".into()),
            content: None,
            ..Default::default()
        },
        SearchHit::new("https://blank.example", "   \n "),
    ];

    let result = ResultDistiller::new(generator.clone())
        .distill("solar glass", &hits, 2, 2)
        .await
        .unwrap();

    assert_eq!(result.learnings, ["Float glass furnaces run at 1500C"]);
    let prompt = &generator.calls_for::<DistillResult>()[0].prompt;
    assert_eq!(prompt.matches("<content>").count(), 1);
    assert!(prompt.contains("<content>\nFurnace temperatures explained\n</content>"));
}

#[tokio::test]
async fn learnings_and_follow_ups_are_capped() {
    let generator = Arc::new(MockGenerator::new().on_distill(
        "wind",
        &["Vestas V236 is 15MW", "", "Haliade-X is 14MW", "SG 14-222 is 14MW"],
        &["Floating foundations?", " ", "Blade recycling?", "Grid links?"],
    ));
    let hits = vec![SearchHit::new("https://wind.example", "turbine ratings")];

    let result = ResultDistiller::new(generator)
        .distill("wind", &hits, 2, 1)
        .await
        .unwrap();

    assert_eq!(result.learnings, ["Vestas V236 is 15MW", "Haliade-X is 14MW"]);
    assert_eq!(result.follow_up_questions, ["Floating foundations?"]);
}

#[tokio::test]
async fn model_is_called_even_without_hits() {
    let generator = Arc::new(MockGenerator::new().on_distill("empty", &[], &[]));

    let result = ResultDistiller::new(generator.clone())
        .distill("empty", &[], 1, 1)
        .await
        .unwrap();

    assert_eq!(result, DistillResult::default());
    let calls = generator.calls_for::<DistillResult>();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.ends_with("<contents></contents>"));
}

#[tokio::test]
async fn generation_failure_is_a_distillation_error() {
    let generator = Arc::new(MockGenerator::new().fail_distill("broken"));

    let err = ResultDistiller::new(generator)
        .distill("broken", &[SearchHit::new("https://b.example", "body")], 1, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::Distillation(_)));
}
