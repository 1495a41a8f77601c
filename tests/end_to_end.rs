//! End-to-end checks driving a full cycle through saved stats files.
//!
//! Each test writes a stats response to a temporary file, runs one check
//! through [`FileSource`] and inspects the verdict, the plugin output and
//! the state file left behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use logstash_check::{
    run_check, Bounds, FileSource, RangeThreshold, Severity, StateRecord, StateStore, Thresholds,
};

fn node_stats(open_fds: i64, pipelines: Value) -> Value {
    json!({
        "host": "logstash-1",
        "version": "7.17.9",
        "jvm": {
            "threads": { "count": 57 },
            "mem": {
                "heap_used_percent": 31,
                "heap_used_in_bytes": 310,
                "heap_max_in_bytes": 1000
            }
        },
        "process": {
            "open_file_descriptors": open_fds,
            "max_file_descriptors": 100,
            "cpu": { "percent": 2 }
        },
        "pipelines": pipelines
    })
}

fn legacy_stats(events_in: i64, events_out: i64) -> Value {
    json!({
        "version": "5.6.16",
        "jvm": {
            "threads": { "count": 30 },
            "mem": {
                "heap_used_percent": 10,
                "heap_used_in_bytes": 100,
                "heap_max_in_bytes": 1000
            }
        },
        "process": {
            "open_file_descriptors": 10,
            "max_file_descriptors": 100,
            "cpu": { "percent": 1 }
        },
        "pipeline": {
            "events": { "in": events_in, "filtered": events_in, "out": events_out },
            "reloads": {
                "successes": 1,
                "failures": 0,
                "last_error": null,
                "last_success_timestamp": "2019-05-01T08:00:00.000Z",
                "last_failure_timestamp": null
            }
        }
    })
}

fn pipeline(events_in: i64, events_out: i64) -> Value {
    json!({
        "events": { "in": events_in, "filtered": events_in, "out": events_out },
        "reloads": { "successes": 0, "failures": 0, "last_error": null }
    })
}

fn write_stats(dir: &Path, stats: &Value) -> PathBuf {
    let path = dir.join("node_stats.json");
    fs::write(&path, serde_json::to_string_pretty(stats).unwrap()).unwrap();
    path
}

fn events_in_threshold() -> Thresholds {
    Thresholds {
        events_in_per_minute: RangeThreshold::new(Bounds::default(), Bounds::new(Some(1), None)),
        ..Thresholds::default()
    }
}

#[tokio::test]
async fn test_file_descriptors_critical() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &node_stats(96, json!({ "main": pipeline(500, 480) })));

    let evaluation = run_check(&FileSource::new(&stats), None, &Thresholds::default())
        .await
        .unwrap();

    assert_eq!(evaluation.report.status(), Severity::Critical);
    assert_eq!(evaluation.exit_code(), 2);

    let output = evaluation.render();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines[0],
        "CRITICAL - Logstash is unhealthy - CRITICAL: Open file descriptors at 96.00%. \
         (96 out of 100 file descriptors are open) | \
         process.cpu.percent=2%;;;0;100 \
         jvm.mem.heap_used_percent=31%;70;80;0;100 \
         jvm.threads.count=57;;;0; \
         process.open_file_descriptors=96;85;95;0;100 \
         pipelines.main.events.in=500c;;;0; \
         pipelines.main.events.out=480c;;;0; \
         inflight_events_main=20;;"
    );
    assert_eq!(
        &lines[1..],
        &[
            "CRITICAL: Open file descriptors at 96.00%. (96 out of 100 file descriptors are open)",
            "OK: Heap usage at 31.00% (310 out of 1000 bytes in use)",
            "OK: Inflight events: main: 20;",
            "OK: Config reload syntax check: main: OK;",
            "OK: CPU usage in percent: 2",
        ]
    );
}

#[tokio::test]
async fn test_healthy_node_writes_no_state() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &node_stats(10, json!({ "main": pipeline(5, 5) })));
    let store = StateStore::for_endpoint(dir.path(), "127.0.0.1", 9600, None);

    let evaluation = run_check(&FileSource::new(&stats), Some(&store), &Thresholds::default())
        .await
        .unwrap();

    assert_eq!(evaluation.exit_code(), 0);
    assert!(evaluation
        .render()
        .starts_with("OK - Logstash seems to be doing fine. | "));
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_first_run_initializes_rates() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(
        dir.path(),
        &node_stats(
            10,
            json!({
                "main": pipeline(500, 480),
                ".monitoring-logstash": pipeline(3, 3),
                "beats": pipeline(70, 70)
            }),
        ),
    );
    let store = StateStore::for_endpoint(dir.path(), "127.0.0.1", 9600, None);

    let evaluation = run_check(&FileSource::new(&stats), Some(&store), &events_in_threshold())
        .await
        .unwrap();

    assert_eq!(evaluation.exit_code(), 0);
    let rates = evaluation.report.results().last().unwrap();
    assert_eq!(rates.severity, Severity::Ok);
    assert_eq!(
        rates.message,
        "Events in per minute: main: Initialized; beats: Initialized;"
    );
    assert!(!evaluation.perfdata.to_string().contains("events_in_per_minute"));

    let saved = store.load().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved.get("main").unwrap().events_in, 500);
    assert_eq!(saved.get("beats").unwrap().events_out, 70);
    assert!(!saved.contains(".monitoring-logstash"));
}

#[tokio::test]
async fn test_second_run_reports_rates() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &node_stats(10, json!({ "main": pipeline(500, 480) })));
    let store = StateStore::for_endpoint(dir.path(), "127.0.0.1", 9600, Some("main"));

    // No events since the previous run, ten minutes ago.
    let mut previous = StateRecord::new();
    previous.insert(
        "main",
        logstash_check::state::PipelineCounters {
            events_in: 500,
            events_out: 470,
            timestamp: logstash_check::data::snapshot::current_timestamp() - 600.0,
        },
    );
    store.save(&previous).unwrap();

    let source = FileSource::new(&stats).with_pipeline(Some("main".to_string()));
    let evaluation = run_check(&source, Some(&store), &events_in_threshold())
        .await
        .unwrap();

    assert_eq!(evaluation.exit_code(), 2);
    assert_eq!(
        evaluation.report.summary(),
        "CRITICAL - Logstash is unhealthy - CRITICAL: Events in per minute: main: 0;"
    );
    assert!(evaluation
        .perfdata
        .to_string()
        .contains("events_in_per_minute_main=0;;1: pipelines.main.events.in=500c;;;0;"));

    let saved = store.load().unwrap();
    assert_eq!(saved.get("main").unwrap().events_out, 480);
}

#[tokio::test]
async fn test_legacy_inflight_events() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &legacy_stats(480, 500));

    let evaluation = run_check(&FileSource::new(&stats), None, &Thresholds::default())
        .await
        .unwrap();

    let inflight = &evaluation.report.results()[2];
    assert_eq!(inflight.message, "Inflight events: 20");
    assert_eq!(evaluation.report.results()[3].message, "Config reload syntax check");

    let perfdata = evaluation.perfdata.to_string();
    assert!(perfdata.contains("pipeline.events.in=480c;;;0; pipeline.events.out=500c;;;0;"));
    assert!(perfdata.ends_with("inflight_events=-20;;"));
}

#[tokio::test]
async fn test_legacy_inflight_events_reversed() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &legacy_stats(500, 480));
    let thresholds = Thresholds {
        inflight_events: RangeThreshold::new(Bounds::new(Some(0), None), Bounds::default()),
        ..Thresholds::default()
    };

    let evaluation = run_check(&FileSource::new(&stats), None, &thresholds)
        .await
        .unwrap();

    let inflight = &evaluation.report.results()[2];
    assert_eq!(inflight.message, "Inflight events: -20");
    assert_eq!(inflight.severity, Severity::Warning);
    assert_eq!(
        evaluation.report.summary(),
        "WARNING - Logstash may not be healthy - WARNING: Inflight events: -20"
    );
}

#[tokio::test]
async fn test_named_inflight_events() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &node_stats(10, json!({ "main": pipeline(500, 480) })));

    let evaluation = run_check(&FileSource::new(&stats), None, &Thresholds::default())
        .await
        .unwrap();

    assert_eq!(evaluation.report.results()[2].message, "Inflight events: main: 20;");
}

#[tokio::test]
async fn test_unknown_pipeline_is_fatal() {
    let dir = TempDir::new().unwrap();
    let stats = write_stats(dir.path(), &node_stats(10, json!({ "main": pipeline(1, 1) })));

    let source = FileSource::new(&stats).with_pipeline(Some("beats".to_string()));
    let err = run_check(&source, None, &Thresholds::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Pipeline not found: beats");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_missing_metric_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut stats = node_stats(10, json!({ "main": pipeline(1, 1) }));
    stats["process"].as_object_mut().unwrap().remove("max_file_descriptors");
    let stats = write_stats(dir.path(), &stats);

    let err = run_check(&FileSource::new(&stats), None, &Thresholds::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid field: process.max_file_descriptors");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_node_status_and_offset_timestamps() {
    let dir = TempDir::new().unwrap();
    let mut main = pipeline(5, 5);
    main["reloads"]["last_success_timestamp"] = json!("2018-02-20T11:44:42.345+0000");
    let mut stats = node_stats(10, json!({ "main": main }));
    stats["status"] = json!("red");
    let stats = write_stats(dir.path(), &stats);

    let thresholds = Thresholds {
        node_status: true,
        ..Thresholds::default()
    };
    let evaluation = run_check(&FileSource::new(&stats), None, &thresholds)
        .await
        .unwrap();

    assert_eq!(evaluation.exit_code(), 2);
    assert_eq!(
        evaluation.report.summary(),
        "CRITICAL - Logstash is unhealthy - CRITICAL: Node status: red"
    );
    assert!(evaluation.render().contains(" | status=red process.cpu.percent=2%"));
}
