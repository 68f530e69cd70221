/// Basic Import Example
///
/// Runs a complete two-entity import against the in-memory document store,
/// with identifier hashing enabled for the customers entity. No external
/// services are required.
///
/// Run with:
/// ```
/// cargo run --example import_run
/// ```
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use trawl_connect::connectors::MemoryConnectorFactory;
use trawl_connect::prelude::*;
use trawl_docstore::memory::MemoryStore;

const CONFIG: &str = r#"
store:
  kind: memory
  database: shop
entities:
  customers:
    collection: customers
    fields:
      - column: _id
        hash_identifier: "${hashIds}"
  orders:
    collection: orders
    delta_command: '{"status": "open"}'
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let store = MemoryStore::new()
        .with_collection(
            "customers",
            vec![
                json!({"_id": "cust-100", "name": "Ada", "city": "Zurich"}),
                json!({"_id": "cust-200", "name": "Grace", "city": "Arlington"}),
            ],
        )
        .with_collection(
            "orders",
            vec![
                json!({"_id": "ord-1", "customer": "cust-100", "status": "open"}),
                json!({"_id": "ord-2", "customer": "cust-200", "status": "shipped"}),
                json!({"_id": "ord-3", "customer": "cust-200", "status": "open"}),
            ],
        );

    let config = ImportConfig::from_yaml(CONFIG)?;
    let metrics = Arc::new(ImportMetrics::new());

    let mut registry = ConnectorRegistry::new();
    registry.register("memory", Arc::new(MemoryConnectorFactory::new(store)));
    let connector: SharedConnector = Arc::new(Mutex::new(
        registry.create(&config.store, Arc::clone(&metrics)).await?,
    ));

    println!("Starting import against {}...", config.store.database);

    let mut names: Vec<&String> = config.enabled_entities().map(|(name, _)| name).collect();
    names.sort();
    for name in names {
        let entity = config.entities[name].clone();
        let transformer = IdHashTransformer::for_entity(&entity);
        let context = EntityContext::new(name, RunMode::Delta).with_variable("hashIds", "true");

        let mut processor = EntityProcessor::new(name, entity, Arc::clone(&metrics));
        processor.init(context.clone(), Arc::clone(&connector))?;

        println!("\nEntity: {name}");
        while let Some(row) = processor.next_row().await? {
            let row = transformer.transform(row, &context)?;
            println!("  {}", serde_json::to_string(&row)?);
        }
    }

    connector.lock().await.close().await;

    let stats = metrics.snapshot();
    println!(
        "\nDone: {} rows from {} queries ({} streams, {} cursor faults)",
        stats.rows_emitted, stats.queries_issued, stats.streams_opened, stats.cursor_faults
    );

    Ok(())
}
