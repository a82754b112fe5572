use bloom_report::config::ReportSettings;
use bloom_report::logger;
use bloom_report::models::fallback::FALLBACK_SOURCE_LABEL;
use bloom_report::models::{
    fallback_dataset, load_all_datasets, load_dataset, BloomCategory, ReportMeta,
};
use bloom_report::render::{text_width_mm, BlockKind, DrawItem, LayoutConfig};
use bloom_report::services::{report_file_name, Aggregator, FeedbackPolicy, ReportWriter};
use bloom_report::{App, Config, ReportRenderer};
use chrono::NaiveDate;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bloom_report_it_{}_{}", name, std::process::id()))
}

async fn file_names(dir: &PathBuf) -> Vec<String> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    names
}

fn folder_config(input: &PathBuf, output: &PathBuf) -> Config {
    Config {
        input_folder: input.display().to_string(),
        output_dir: output.display().to_string(),
        max_concurrent_reports: 2,
        output_log_file: input.join("run.txt").display().to_string(),
        ..Config::default()
    }
}

fn fallback_view_model() -> bloom_report::ReportViewModel {
    let records = fallback_dataset().into_records().expect("内置数据集应能规范化");
    Aggregator::default()
        .build_view_model(ReportMeta::new("VR Midterm", FALLBACK_SOURCE_LABEL), records)
        .expect("统计失败")
}

#[test]
fn test_fallback_dataset_statistics() {
    let vm = fallback_view_model();

    assert_eq!(vm.questions.len(), 14);
    assert_eq!(vm.overall_score, 37.0);
    assert_eq!(vm.overall_max, 51.0);
    assert_eq!(vm.overall_percentage(), Some(73));
    assert_eq!(vm.complexity_score, Some(61));

    let breakdown: Vec<(BloomCategory, u32, usize)> = vm
        .category_breakdown
        .iter()
        .map(|a| (a.category, a.percentage, a.question_count))
        .collect();
    assert_eq!(
        breakdown,
        vec![
            (BloomCategory::Understanding, 71, 2),
            (BloomCategory::Applying, 69, 4),
            (BloomCategory::Analyzing, 63, 2),
            (BloomCategory::Evaluating, 90, 3),
            (BloomCategory::Creating, 69, 3),
        ]
    );

    let q8 = &vm.questions[7];
    assert_eq!(q8.totals.max, 4.0);
    assert_eq!(q8.totals.percentage(), Some(75));
}

#[test]
fn test_statistics_are_idempotent() {
    let first = fallback_view_model();
    let second = fallback_view_model();
    assert_eq!(first.category_breakdown, second.category_breakdown);
    assert_eq!(first.complexity_score, second.complexity_score);
}

#[test]
fn test_fallback_report_renders_every_question() {
    let vm = fallback_view_model();
    let report = ReportRenderer::new(LayoutConfig::default(), FeedbackPolicy::default())
        .render(&vm)
        .expect("渲染失败");

    for question in &vm.questions {
        let id = question.record.id;
        assert!(report
            .blocks()
            .any(|b| b.kind == BlockKind::Feedback { question_id: id }));
    }

    let pdf = report.to_pdf().expect("PDF 编码失败");
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_tight_layout_still_keeps_blocks_on_one_page() {
    let settings = ReportSettings::from_toml_str(
        r#"
        [layout]
        usable_height = 150.0
        right_margin = 30.0
        "#,
    )
    .expect("设置解析失败");

    let vm = fallback_view_model();
    let report = ReportRenderer::new(settings.layout.clone(), FeedbackPolicy::default())
        .render(&vm)
        .expect("渲染失败");

    let right_edge = settings.layout.page_width - settings.layout.right_margin;
    for page in &report.pages {
        for block in &page.blocks {
            assert!(block.top + block.height <= settings.layout.usable_height + 1e-3);
            for item in &block.items {
                if let DrawItem::Text { x, size, font, text, .. } = item {
                    let end = x + text_width_mm(text, *font, *size);
                    assert!(end <= right_edge + 1e-3, "{:?} 超出右边距", text);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_writer_uses_slug_and_date() {
    let dir = temp_dir("writer");
    let writer = ReportWriter::new(&dir);
    let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

    let path = tokio_test::assert_ok!(writer.write("VR / Midterm", date, b"%PDF-1.5").await);
    assert_eq!(path, dir.join("vr-midterm-2026-10-15.pdf"));
    assert_eq!(report_file_name("VR / Midterm", date), "vr-midterm-2026-10-15.pdf");

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_loader_reads_json_folder() {
    let dir = temp_dir("loader");
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let json = include_str!("../data/fallback_rubric.json");
    tokio::fs::write(dir.join("vr_midterm.json"), json).await.unwrap();
    tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

    let datasets = tokio_test::assert_ok!(load_all_datasets(&dir.display().to_string()).await);
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].title(), "vr midterm");
    assert_eq!(datasets[0].dataset.len(), 14);

    let single = tokio_test::assert_ok!(load_dataset(&dir.join("vr_midterm.json")).await);
    assert_eq!(single.name, "vr_midterm");

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_app_renders_input_folder() {
    logger::init(false);

    let input = temp_dir("app_input");
    let output = temp_dir("app_output");
    tokio::fs::create_dir_all(&input).await.unwrap();
    let json = include_str!("../data/fallback_rubric.json");
    tokio::fs::write(input.join("unit-one.json"), json).await.unwrap();
    tokio::fs::write(input.join("unit-two.json"), json).await.unwrap();

    let app = tokio_test::assert_ok!(App::initialize(folder_config(&input, &output)).await);
    let stats = tokio_test::assert_ok!(app.run().await);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.failed, 0);

    let written = file_names(&output).await;
    assert_eq!(written.len(), 2);
    assert!(written[0].starts_with("unit-one-"));
    assert!(written[1].starts_with("unit-two-"));

    let _ = tokio::fs::remove_dir_all(&input).await;
    let _ = tokio::fs::remove_dir_all(&output).await;
}

#[tokio::test]
async fn test_colliding_slugs_keep_both_reports() {
    logger::init(false);

    let input = temp_dir("collide_input");
    let output = temp_dir("collide_output");
    let _ = tokio::fs::remove_dir_all(&output).await;
    tokio::fs::create_dir_all(&input).await.unwrap();
    let json = include_str!("../data/fallback_rubric.json");
    tokio::fs::write(input.join("unit-one.json"), json).await.unwrap();
    tokio::fs::write(input.join("unit_one.json"), json).await.unwrap();

    let app = tokio_test::assert_ok!(App::initialize(folder_config(&input, &output)).await);
    let stats = tokio_test::assert_ok!(app.run().await);
    assert_eq!(stats.success, 2);

    let written = file_names(&output).await;
    assert_eq!(written.len(), 2, "{:?}", written);
    let date = chrono::Local::now().date_naive();
    assert!(written.contains(&format!("unit-one-{}.pdf", date)));
    assert!(written.contains(&format!("unit-one-{}-2.pdf", date)));

    let _ = tokio::fs::remove_dir_all(&input).await;
    let _ = tokio::fs::remove_dir_all(&output).await;
}

#[tokio::test]
async fn test_app_renders_cognitive_dataset_with_question_paper() {
    logger::init(false);

    let input = temp_dir("cognitive_input");
    let output = temp_dir("cognitive_output");
    let _ = tokio::fs::remove_dir_all(&output).await;
    tokio::fs::create_dir_all(&input).await.unwrap();
    let json = include_str!("../data/sample_cognitive.json");
    tokio::fs::write(input.join("ml_quiz.json"), json).await.unwrap();

    let config = Config {
        export_question_paper: true,
        ..folder_config(&input, &output)
    };
    let app = tokio_test::assert_ok!(App::initialize(config).await);
    let stats = tokio_test::assert_ok!(app.run().await);
    assert_eq!(stats.success, 1);

    let written = file_names(&output).await;
    assert_eq!(written.len(), 2, "{:?}", written);
    assert!(written[0].starts_with("cognitive-analysis-ml-quiz-"));
    assert!(written[1].starts_with("ml-quiz-"));

    let _ = tokio::fs::remove_dir_all(&input).await;
    let _ = tokio::fs::remove_dir_all(&output).await;
}

#[tokio::test]
#[ignore] // 需要网络：cargo test -- --ignored
async fn test_app_with_remote_source() {
    logger::init(true);

    let config = Config {
        input_folder: temp_dir("missing").display().to_string(),
        output_dir: temp_dir("remote_output").display().to_string(),
        ..Config::from_env()
    };

    let app = App::initialize(config).await.expect("初始化失败");
    let stats = app.run().await.expect("运行失败");
    assert_eq!(stats.success, 1);
}
