use std::sync::Arc;

use deep_research::feedback::FeedbackQuestions;
use deep_research::report::ReportDraft;
use deep_research::testing::MockGenerator;
use deep_research::{generate_feedback, ReportSynthesizer, ResearchError, ResearchResult, SearchHit};

#[tokio::test]
async fn report_appends_sources_in_first_seen_order() {
    let generator = Arc::new(MockGenerator::new().on_report("# Offshore wind\n\nBody."));
    let synthesizer = ReportSynthesizer::new(generator.clone());

    let report = synthesizer
        .synthesize(
            "offshore wind",
            &["Hornsea 2 is 1.3GW".to_string()],
            &["https://z.example".to_string(), "https://a.example".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(
        report.markdown,
        "# Offshore wind\n\nBody.\n\n## Sources\n\n- https://z.example\n- https://a.example"
    );

    let call = &generator.calls_for::<ReportDraft>()[0];
    assert!(call.prompt.contains("<prompt>offshore wind</prompt>"));
    assert!(call
        .prompt
        .contains("<learnings>\n<learning>\nHornsea 2 is 1.3GW\n</learning>\n</learnings>"));
}

#[tokio::test]
async fn report_without_sources_has_no_sources_section() {
    let generator = Arc::new(MockGenerator::new().on_report("Only prose."));
    let report = ReportSynthesizer::new(generator)
        .synthesize("topic", &["fact".to_string()], &[])
        .await
        .unwrap();

    assert_eq!(report.markdown, "Only prose.");
    assert!(!report.markdown.contains("Sources"));
}

#[tokio::test]
async fn report_from_result_uses_visited_order() {
    let generator = Arc::new(MockGenerator::new().on_report("Report."));
    let result = ResearchResult::from_parts(
        ["one".to_string(), "two".into()],
        [
            SearchHit::new("https://first.example", "1"),
            SearchHit::new("https://second.example", "2"),
            SearchHit::new("https://first.example", "dup"),
        ],
    );

    let report = ReportSynthesizer::new(generator)
        .synthesize_result("topic", &result)
        .await
        .unwrap();

    assert!(report
        .markdown
        .ends_with("## Sources\n\n- https://first.example\n- https://second.example"));
}

#[tokio::test]
async fn oversized_learnings_are_trimmed_before_prompting() {
    let generator = Arc::new(MockGenerator::new().on_report("Report."));
    let learnings: Vec<String> = (0..200)
        .map(|i| format!("Learning number {i} about lithium refining capacity in Chile."))
        .collect();

    ReportSynthesizer::new(generator.clone())
        .with_learnings_budget(300)
        .synthesize("lithium", &learnings, &[])
        .await
        .unwrap();

    let prompt = &generator.calls_for::<ReportDraft>()[0].prompt;
    assert!(prompt.contains("Learning number 0 about"));
    assert!(!prompt.contains("Learning number 199 about"));
}

#[tokio::test]
async fn synthesis_failure_surfaces() {
    let generator = Arc::new(MockGenerator::new());
    let err = ReportSynthesizer::new(generator)
        .synthesize("topic", &[], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ResearchError::Synthesis(_)));
}

#[tokio::test]
async fn feedback_is_capped() {
    let generator = MockGenerator::new().on_feedback(&["Which region?", "", "Which years?", "Which fuels?"]);

    let questions = generate_feedback(&generator, "energy transition", 2).await.unwrap();

    assert_eq!(questions, ["Which region?", "Which years?"]);
    let call = &generator.calls_for::<FeedbackQuestions>()[0];
    assert!(call.prompt.contains("<query>energy transition</query>"));
    assert!(call.prompt.contains("Return a maximum of 2 questions"));
}

#[tokio::test]
async fn feedback_failure_surfaces() {
    let generator = MockGenerator::new();
    let err = generate_feedback(&generator, "energy", 3).await.unwrap_err();
    assert!(matches!(err, ResearchError::Feedback(_)));
}
