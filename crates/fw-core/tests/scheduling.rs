use chrono::{DateTime, Duration, TimeZone, Utc};
use fw_core::block::{build_block, BlockContext};
use fw_core::cache::{CacheEntry, CacheStore};
use fw_core::config::{BlockConfig, GeneralConfig};
use fw_core::{Block, BlockError, Bus, Cmd, Message, ParsedValue, Registry};
use std::collections::BTreeMap;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

struct Fixture {
    registry: Registry,
    general: GeneralConfig,
    cache: CacheStore,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self {
            registry: Registry::with_builtins(),
            general: GeneralConfig::default(),
            cache: CacheStore::new(dir.path()),
            _dir: dir,
        }
    }

    fn block(&self, id: &str, config: &BlockConfig) -> Box<dyn Block> {
        build_block(
            id,
            config,
            BlockContext {
                registry: &self.registry,
                general: &self.general,
                cache: &self.cache,
            },
        )
        .expect("build block")
    }
}

fn shell(command: &str, update_seconds: f64, cache: f64) -> BlockConfig {
    BlockConfig {
        kind: Some("ShellCommand".into()),
        command: Some(command.into()),
        parser: Some("single_line".into()),
        renderer: Some("raw_text".into()),
        update_seconds: Some(update_seconds),
        cache: Some(cache),
        ..BlockConfig::default()
    }
}

fn has_refresh(cmd: &Cmd) -> bool {
    matches!(cmd, Cmd::Refresh(_))
}

fn tick_at(cmds: &[Cmd]) -> Option<DateTime<Utc>> {
    cmds.iter().find_map(|cmd| match cmd {
        Cmd::TickAt { at, .. } => Some(*at),
        _ => None,
    })
}

#[test]
fn periodic_block_waits_for_its_interval() {
    let fx = Fixture::new();
    let mut block = fx.block("uptime", &shell("uptime -p", 5.0, 0.0));

    assert!(has_refresh(&block.check_and_maybe_refresh(t(0))));
    let cmds = block
        .receive(&Message::fresh("uptime", Ok("up 1 hour".into())), t(0))
        .flatten();
    assert_eq!(tick_at(&cmds), Some(t(5)));
    assert!(
        !cmds.iter().any(|cmd| matches!(cmd, Cmd::WriteCache { .. })),
        "cache = 0 disables writes"
    );

    assert!(block.check_and_maybe_refresh(t(3)).is_none());
    assert!(has_refresh(&block.check_and_maybe_refresh(t(6))));
}

#[test]
fn refreshes_never_overlap() {
    let fx = Fixture::new();
    let mut block = fx.block("slow", &shell("sleep 30", 1.0, 0.0));
    assert!(has_refresh(&block.check_and_maybe_refresh(t(0))));
    for secs in 1..10 {
        assert!(block.check_and_maybe_refresh(t(secs)).is_none());
        assert!(block.receive(&Message::Heartbeat, t(secs)).is_none());
        assert!(block.receive(&Message::TriggerAll, t(secs)).is_none());
    }
}

#[test]
fn failed_refresh_renders_error_and_is_rescheduled() {
    let fx = Fixture::new();
    let mut block = fx.block("apps", &shell("count-apps", 10.0, 60.0));
    block.check_and_maybe_refresh(t(0));
    let cmds = block
        .receive(
            &Message::fresh(
                "apps",
                Err(BlockError::Execution("exit status: 127".into())),
            ),
            t(2),
        )
        .flatten();

    assert_eq!(tick_at(&cmds), Some(t(12)));
    assert!(!cmds.iter().any(|cmd| matches!(cmd, Cmd::WriteCache { .. })));
    assert_eq!(
        block.render(80),
        "Error in 'apps': command failed: exit status: 127"
    );
}

#[test]
fn successful_refresh_with_cache_requests_a_write() {
    let fx = Fixture::new();
    let mut block = fx.block("kernel", &shell("uname -r", 10.0, 300.0));
    block.check_and_maybe_refresh(t(0));
    let cmds = block
        .receive(&Message::fresh("kernel", Ok("6.8.0".into())), t(1))
        .flatten();
    let written = cmds.iter().find_map(|cmd| match cmd {
        Cmd::WriteCache { block_id, entry } => Some((block_id.clone(), entry.clone())),
        _ => None,
    });
    let (id, entry) = written.expect("cache write");
    assert_eq!(id, "kernel");
    assert_eq!(entry.timestamp, t(1));
    assert_eq!(entry.parsed_data, ParsedValue::from("6.8.0"));
}

#[test]
fn cached_data_rearms_without_writing() {
    let fx = Fixture::new();
    let mut block = fx.block("kernel", &shell("uname -r", 10.0, 300.0));
    block.check_and_maybe_refresh(t(0));
    let cmds = block
        .receive(
            &Message::CachedData {
                block_id: "kernel".into(),
                value: std::sync::Arc::new("6.8.0".into()),
            },
            t(0),
        )
        .flatten();
    assert_eq!(tick_at(&cmds), Some(t(10)));
    assert!(!cmds.iter().any(|cmd| matches!(cmd, Cmd::WriteCache { .. })));
    assert_eq!(block.render(80), "6.8.0");
}

#[test]
fn trigger_all_bypasses_the_interval() {
    let fx = Fixture::new();
    let mut block = fx.block("uptime", &shell("uptime -p", 60.0, 0.0));
    block.check_and_maybe_refresh(t(0));
    block.receive(&Message::fresh("uptime", Ok("up".into())), t(0));
    assert!(block.check_and_maybe_refresh(t(1)).is_none());
    assert!(has_refresh(&block.receive(&Message::TriggerAll, t(1))));
}

#[test]
fn stream_batches_feed_counters_regardless_of_batching() {
    let fx = Fixture::new();
    let log_tail = BlockConfig {
        kind: Some("ShellCommand".into()),
        command: Some("tail -f /var/log/syslog".into()),
        renderer: Some("list".into()),
        streaming: true,
        ..BlockConfig::default()
    };
    let counter = BlockConfig {
        kind: Some("WordCounter".into()),
        listens_to: Some("log_tail".into()),
        count_string: Some("ERROR".into()),
        ..BlockConfig::default()
    };
    let lines = ["INFO x", "ERROR y", "ERROR z"];

    let split_runs: [&[&[&str]]; 3] = [
        &[&lines[..2], &lines[2..]],
        &[&lines[..]],
        &[&lines[..1], &lines[1..2], &lines[2..]],
    ];
    for batches in split_runs {
        let mut bus = Bus::new(vec![
            fx.block("log_tail", &log_tail),
            fx.block("err_counter", &counter),
        ]);
        bus.dispatch(Message::Heartbeat, t(0));
        for batch in batches {
            let owned = batch.iter().map(|line| line.to_string()).collect();
            bus.dispatch(Message::stream_batch("log_tail", owned), t(1));
        }
        assert_eq!(
            bus.block("err_counter").expect("counter").render(80),
            "'ERROR' seen in 'log_tail': 2 times"
        );
    }
}

#[test]
fn every_value_shape_survives_the_cache() {
    let fx = Fixture::new();
    let values = [
        ("text", ParsedValue::from("hello"), "raw_text"),
        (
            "lines",
            ParsedValue::Lines(vec!["a".into(), "b".into()]),
            "list",
        ),
        (
            "grid",
            ParsedValue::Grid(vec![vec!["NAME".into(), "VER".into()], vec!["rustc".into(), "1.80".into()]]),
            "table",
        ),
        (
            "map",
            ParsedValue::Map(BTreeMap::from([("cpu".to_string(), "42".to_string())])),
            "gauge",
        ),
    ];
    for (id, value, renderer) in values {
        fx.cache
            .store(id, &CacheEntry::new(Utc::now(), value.clone()))
            .expect("store");
        let loaded = fx.cache.load(id).expect("load");
        assert_eq!(loaded.parsed_data, value, "{id}");
        let rendered = fx
            .registry
            .renderer(renderer)
            .expect("renderer")
            .render(&loaded.parsed_data, 80);
        assert!(!rendered.starts_with("Error"), "{id}: {rendered}");
    }

    let entry = fx.cache.load("text").expect("text");
    assert!(entry.is_fresh(entry.timestamp + Duration::seconds(59), Duration::seconds(60)));
    assert!(!entry.is_fresh(entry.timestamp + Duration::seconds(60), Duration::seconds(60)));
}
