use anyhow::Result;
use frame_pipes::utils::validation::Validate;
use frame_pipes::{
    with_end_marker, BatchLoader, CsvSink, EtlError, Frame, JsonLinesSink, MemorySink, Pipeline,
    PipelineConfig,
};
use serde_json::json;
use tempfile::TempDir;

const CONFIG: &str = r#"
[pipeline]
name = "customers"
description = "Trim and load customer rows"

[load]
target = "customers"
batch_size = 2
columns = ["customer_id", "customer_name", "city"]

[[transform.trim]]
column = "name"

[[transform.trim]]
column = "city"
mode = "right-trim"
mask = " ."

[logging]
level = "debug"
"#;

fn customer_frames() -> Result<Vec<Frame>> {
    let rows = vec![
        vec![json!(1), json!("  Ada "), json!("London.. ")],
        vec![json!(2), json!("Lin\t"), json!(" Taipei")],
        vec![json!(3), json!(null), json!("Oslo")],
    ];

    let mut frames = Vec::new();
    for (line, values) in rows.into_iter().enumerate() {
        let mut frame = Frame::new().with_header(["id", "name", "city"]);
        frame.set_data(values)?;
        frame.set_attribute("line", line + 1);
        frames.push(frame);
    }
    Ok(frames)
}

fn build_pipeline<S: frame_pipes::Sink>(
    config: &PipelineConfig,
    sink: S,
) -> Result<Pipeline<BatchLoader<S>>> {
    let loader = BatchLoader::with_settings(sink, config.load_settings())?;
    let mut pipeline = Pipeline::new(config.name(), loader);
    if let Some(trim) = config.trim_transformer()? {
        pipeline = pipeline.with_transformer(trim);
    }
    Ok(pipeline)
}

#[tokio::test]
async fn test_configured_pipeline_into_memory() -> Result<()> {
    let config = PipelineConfig::from_toml_str(CONFIG)?;
    config.validate()?;
    config.init_logging(false);

    let mut pipeline = build_pipeline(&config, MemorySink::new())?;
    assert_eq!(pipeline.stage_count(), 1);

    let summary = pipeline.run(with_end_marker(customer_frames()?)).await?;
    assert_eq!(summary.frames, 3);

    let loader = pipeline.into_loader();
    assert_eq!(loader.stats().flushes, 2);

    let rows: Vec<serde_json::Value> = loader
        .sink()
        .rows()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;
    assert_eq!(
        rows,
        vec![
            json!({"customer_id": 1, "customer_name": "Ada", "city": "London"}),
            json!({"customer_id": 2, "customer_name": "Lin", "city": " Taipei"}),
            json!({"customer_id": 3, "customer_name": "", "city": "Oslo"}),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_pipeline_writes_csv_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("customers.csv");

    let config = PipelineConfig::from_toml_str(CONFIG)?;
    let sink = CsvSink::create(&path).await?.with_header(
        config
            .load
            .columns
            .clone()
            .unwrap_or_default(),
    );
    let mut pipeline = build_pipeline(&config, sink)?;

    pipeline.run(with_end_marker(customer_frames()?)).await?;

    let content = tokio::fs::read_to_string(&path).await?;
    assert_eq!(
        content,
        "customer_id,customer_name,city\n1,Ada,London\n2,Lin, Taipei\n3,,Oslo\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_pipeline_writes_json_lines_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("customers.jsonl");

    let config = PipelineConfig::from_toml_str(CONFIG)?;
    let sink = JsonLinesSink::create(&path).await?;
    let mut pipeline = build_pipeline(&config, sink)?;

    pipeline.run(with_end_marker(customer_frames()?)).await?;

    let content = tokio::fs::read_to_string(&path).await?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        r#"{"customer_id":1,"customer_name":"Ada","city":"London"}"#
    );
    Ok(())
}

#[tokio::test]
async fn test_invalid_trim_mode_stops_pipeline_at_first_frame() -> Result<()> {
    let config = PipelineConfig::from_toml_str(
        r#"
[pipeline]
name = "bad-mode"

[load]
target = "memory"

[[transform.trim]]
column = "name"
mode = "middle"
"#,
    )?;
    config.validate()?;

    let mut pipeline = build_pipeline(&config, MemorySink::new())?;
    let err = pipeline
        .run(with_end_marker(customer_frames()?))
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::InvalidArgument { .. }));
    assert!(pipeline.loader().buffered().is_empty());
    assert!(pipeline.loader().sink().batches().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_independent_pipelines_do_not_share_buffers() -> Result<()> {
    let config = PipelineConfig::from_toml_str(CONFIG)?;
    let mut first = build_pipeline(&config, MemorySink::new())?;
    let mut second = build_pipeline(&config, MemorySink::new())?;

    let frames = customer_frames()?;
    first.process(frames[0].clone()).await?;
    second.run(with_end_marker(frames)).await?;

    assert_eq!(first.loader().buffered().len(), 1);
    assert!(first.loader().sink().batches().is_empty());
    assert_eq!(second.loader().stats().rows_written, 3);
    Ok(())
}
