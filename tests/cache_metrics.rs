use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::channel::mpsc;
use futures::StreamExt;
use gqlcache::cache::{CacheConfig, CacheExchange, CacheSession};
use gqlcache::domain::{Operation, OperationKind, OperationResult};
use gqlcache::infra::telemetry;
use gqlcache::pipeline::{Client, Forward, OperationStream, ResultStream};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

#[derive(Default)]
struct RecordingClient {
    operations: Mutex<Vec<Operation>>,
}

impl Client for RecordingClient {
    fn reexecute_operation(&self, operation: Operation) {
        self.operations.lock().expect("client lock").push(operation);
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let forward = |operations: OperationStream| -> ResultStream {
        operations
            .map(|operation| {
                let data = match operation.kind {
                    OperationKind::Mutation => json!({"addTodo": {"id": 2, "__typename": "Todo"}}),
                    _ => json!({"todos": [{"id": 1, "__typename": "Todo"}]}),
                };
                OperationResult::with_data(operation, data)
            })
            .boxed()
    };
    let forward: Arc<dyn Forward> = Arc::new(forward);
    let client = Arc::new(RecordingClient::default());
    let exchange = CacheExchange::new(
        CacheConfig::default(),
        Arc::new(CacheSession::new()),
        forward,
        client.clone(),
    );

    let (input, operations) = mpsc::unbounded();
    let mut output = exchange.run(operations.boxed());

    // miss + store, then hit, then invalidation + re-execution
    let query = Operation::query("query { todos { id } }", None);
    for operation in [
        query.clone(),
        query,
        Operation::mutation("mutation { addTodo { id } }", None),
    ] {
        input.unbounded_send(operation).expect("send operation");
        output.next().await.expect("result");
    }
    assert_eq!(client.operations.lock().expect("client lock").len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "gqlcache_hit_total",
        "gqlcache_miss_total",
        "gqlcache_store_total",
        "gqlcache_invalidated_total",
        "gqlcache_reexecute_total",
        "gqlcache_entries",
        "gqlcache_invalidate_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
