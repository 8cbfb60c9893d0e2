use std::sync::Arc;
use tabscribe_core::config::{load_config, select_datasets};
use tabscribe_core::engine::backoff::NoDelay;
use tabscribe_core::engine::driver::Converter;
use tabscribe_core::engine::executor::CallExecutor;
use tabscribe_core::providers::llm::fake::ScriptedClient;
use tabscribe_core::storage::{ResultStore, StreamKind};
use tempfile::tempdir;

const CONFIG: &str = r#"
version: 1
fallbacks:
  small: large
datasets:
  - id: trials
    data_path: tables
    output_path: text_description
    units:
      phases: [I, II]
      splits: [train, test]
    schema_definition: |-
      phase: the phase of the trial.
      drugs: list of drug names.
    request:
      model: small
      temperature: 0
      messages:
        - role: system
          content: You are a helpful assistant.
        - role: user
          content: "Schema:\n$schema_definition\nRow:\n$linearization"
"#;

#[tokio::test]
async fn converts_every_unit_of_a_dataset() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let tables = dir.path().join("tables");
    std::fs::create_dir_all(&tables)?;
    for (p, s, rows) in [("I", "train", 2), ("I", "test", 1), ("II", "train", 3), ("II", "test", 1)] {
        let mut csv = String::from("nct_id,phase,drugs\n");
        for i in 0..rows {
            csv.push_str(&format!("NCT{},{},\"['d{}']\"\n", i, p, i));
        }
        std::fs::write(tables.join(format!("phase_{}_{}.csv", p, s)), csv)?;
    }
    let config_path = dir.path().join("datasets.yaml");
    std::fs::write(&config_path, CONFIG)?;

    let cfg = load_config(&config_path, true)?;
    let datasets = select_datasets(&cfg, &["trials".to_string()])?;
    let client = Arc::new(ScriptedClient::echo());
    let conv = Converter::new(CallExecutor::new(
        client.clone(),
        Arc::new(NoDelay::default()),
        cfg.fallbacks.clone(),
    ));

    let reports = conv.convert_dataset(datasets[0]).await?;
    let units: Vec<_> = reports.iter().map(|r| r.unit.as_str()).collect();
    assert_eq!(
        units,
        vec!["phase_I_train", "phase_I_test", "phase_II_train", "phase_II_test"]
    );
    assert!(reports.iter().all(|r| r.is_complete() && r.dataset == "trials"));
    assert_eq!(client.call_count(), 7);

    let first = client.calls()[0].clone();
    assert_eq!(
        first.last_content(),
        Some("Schema:\nphase: the phase of the trial.\ndrugs: list of drug names.\nRow:\nphase: I; drugs: ['d0']")
    );

    let store = ResultStore::open(&dir.path().join("tables/text_description"))?;
    for kind in StreamKind::ALL {
        assert!(store.artifact_path(kind, "phase_II_train").exists());
    }
    assert_eq!(store.load("phase_II_train")?.processed.len(), 3);
    Ok(())
}

#[tokio::test]
async fn missing_table_aborts_the_run() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("datasets.yaml");
    std::fs::write(&config_path, CONFIG)?;
    let cfg = load_config(&config_path, true)?;

    let conv = Converter::new(CallExecutor::new(
        Arc::new(ScriptedClient::echo()),
        Arc::new(NoDelay::default()),
        cfg.fallbacks.clone(),
    ));
    let err = conv.convert_dataset(&cfg.datasets[0]).await.unwrap_err();
    assert!(format!("{:#}", err).contains("phase_I_train.csv"));
    Ok(())
}
