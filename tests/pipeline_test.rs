//! End-to-end tests for the speedfog binary
//!
//! Each test drives the real binary over TOML fixtures in a temp
//! directory: cluster-build first, then generate, asserting on exit codes,
//! emitted documents, and determinism.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// A small but complete world: a two-gate start, three caves, one legacy
/// dungeon, one boss arena, and a final throne. Every dungeon hangs off the
/// overworld hub through bidirectional gates, so every cluster survives the
/// usable-exit rule.
const FOG_DB: &str = r#"
[[areas]]
name = "limgrave"
maps = ["m60_00"]
tags = "overworld"

[[areas]]
name = "gatefront"
maps = ["m60_42"]
tags = "start"

[[areas]]
name = "murkwater_cave"
maps = ["m31_02"]

[[areas]]
name = "earthbore_cave"
maps = ["m31_04"]

[[areas]]
name = "groveside_cave"
maps = ["m31_03"]

[[areas]]
name = "stormveil"
maps = ["m10_00"]
tags = "legacy"
defeat_flag = 10000800

[[areas]]
name = "bridge_arena"
maps = ["m60_10"]
defeat_flag = 60100800

[[areas]]
name = "throne"
maps = ["m11_00"]
tags = "final"
defeat_flag = 11000800

[[fogs]]
name = "gatefront_west"
a = "gatefront"
b = "limgrave"
map = "m60_42"

[[fogs]]
name = "gatefront_east"
a = "gatefront"
b = "limgrave"
map = "m60_42"

[[fogs]]
name = "gatefront_ruin"
a = "gatefront"
b = "limgrave"
map = "m60_42"

[[fogs]]
name = "murkwater_mouth"
a = "murkwater_cave"
b = "limgrave"
map = "m31_02"

[[fogs]]
name = "murkwater_depths"
a = "murkwater_cave"
b = "limgrave"
map = "m31_02"

[[fogs]]
name = "earthbore_mouth"
a = "earthbore_cave"
b = "limgrave"
map = "m31_04"

[[fogs]]
name = "earthbore_depths"
a = "earthbore_cave"
b = "limgrave"
map = "m31_04"

[[fogs]]
name = "groveside_mouth"
a = "groveside_cave"
b = "limgrave"
map = "m31_03"

[[fogs]]
name = "groveside_depths"
a = "groveside_cave"
b = "limgrave"
map = "m31_03"

[[fogs]]
name = "stormveil_main"
a = "stormveil"
b = "limgrave"
map = "m10_00"

[[fogs]]
name = "stormveil_rear"
a = "stormveil"
b = "limgrave"
map = "m10_00"

[[fogs]]
name = "arena_north"
a = "bridge_arena"
b = "limgrave"
map = "m60_10"

[[fogs]]
name = "arena_south"
a = "bridge_arena"
b = "limgrave"
map = "m60_10"

[[fogs]]
name = "throne_gate"
a = "throne"
b = "limgrave"
map = "m11_00"

[[fogs]]
name = "throne_balcony"
a = "throne"
b = "limgrave"
map = "m11_00"
"#;

const METADATA: &str = r#"
[defaults]
start = 0
final_boss = 0
mini_dungeon = 10
legacy_dungeon = 25
boss_arena = 8
major_boss = 15
"#;

const CONFIG: &str = r#"
seed = 42

[budget]
total_weight = 55
tolerance = 25

[requirements]
legacy_dungeons = 1
mini_dungeons = 2
bosses = 1

[structure]
min_layers = 4
max_layers = 4
max_parallel_paths = 2
major_boss_ratio = 0.0
"#;

struct TestContext {
    speedfog_bin: PathBuf,
    _temp_dir: TempDir,
    dir: PathBuf,
}

struct TestOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        std::fs::write(dir.join("fog.toml"), FOG_DB).unwrap();
        std::fs::write(dir.join("meta.toml"), METADATA).unwrap();
        std::fs::write(dir.join("speedfog.toml"), CONFIG).unwrap();

        let speedfog_bin = std::env::var("CARGO_BIN_EXE_speedfog")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./target/debug/speedfog"));

        Self {
            speedfog_bin,
            _temp_dir: temp_dir,
            dir,
        }
    }

    fn run(&self, args: &[&str]) -> TestOutput {
        let output = Command::new(&self.speedfog_bin)
            .current_dir(&self.dir)
            .args(args)
            .output()
            .expect("failed to run speedfog");
        TestOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    fn cluster_build(&self) -> TestOutput {
        self.run(&[
            "cluster-build",
            "fog.toml",
            "clusters.json",
            "--metadata",
            "meta.toml",
        ])
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.join(name))
            .unwrap_or_else(|e| panic!("reading {name}: {e}"))
    }
}

#[test]
fn test_cluster_build_document() {
    let ctx = TestContext::new();
    let out = ctx.cluster_build();
    assert!(out.success, "stderr: {}", out.stderr);

    let doc: serde_json::Value = serde_json::from_str(&ctx.read("clusters.json")).unwrap();
    let clusters = doc["clusters"].as_array().unwrap();
    // limgrave is overworld; everything else becomes a cluster.
    assert_eq!(clusters.len(), 7);

    let types: Vec<&str> = clusters
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    assert_eq!(types.iter().filter(|t| **t == "mini_dungeon").count(), 3);
    assert_eq!(types.iter().filter(|t| **t == "start").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "final_boss").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "legacy_dungeon").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "boss_arena").count(), 1);

    // Ordered by id.
    let ids: Vec<&str> = clusters.iter().map(|c| c["id"].as_str().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);

    // Caves carry their subtype; weights follow the metadata defaults.
    let cave = clusters
        .iter()
        .find(|c| c["id"].as_str().unwrap().starts_with("murkwater_cave"))
        .unwrap();
    assert_eq!(cave["subtype"], "cave");
    assert_eq!(cave["weight"], 10);
}

#[test]
fn test_cluster_build_malformed_database() {
    let ctx = TestContext::new();
    std::fs::write(ctx.dir.join("broken.toml"), "[[areas]\nname=").unwrap();
    let out = ctx.run(&["cluster-build", "broken.toml", "clusters.json"]);
    assert!(!out.success);
    assert!(out.stderr.contains("malformed fog database"));
}

#[test]
fn test_generate_run() {
    let ctx = TestContext::new();
    assert!(ctx.cluster_build().success);

    let out = ctx.run(&["generate", "--config", "speedfog.toml", "--spoiler"]);
    assert!(out.success, "stderr: {}", out.stderr);
    assert!(out.stdout.contains("seed 42"));

    let doc: serde_json::Value = serde_json::from_str(&ctx.read("graph.json")).unwrap();
    assert_eq!(doc["seed"], 42);
    assert_eq!(doc["total_layers"], 4);
    assert_eq!(doc["finish_event"], 9801);
    assert_eq!(doc["event_map"], "m11_00");
    assert_eq!(doc["final_node_flag"], 11000800);
    assert!(doc["total_paths"].as_u64().unwrap() >= 1);
    assert!(doc["start_id"].as_str().unwrap().starts_with("gatefront"));
    assert!(doc["end_id"].as_str().unwrap().starts_with("throne"));

    let spoiler = ctx.read("spoiler.txt");
    assert!(spoiler.starts_with("seed: 42"));
    assert!(spoiler.contains("layer 0:"));
    assert!(spoiler.contains("paths:"));
}

#[test]
fn test_generate_is_deterministic() {
    let ctx = TestContext::new();
    assert!(ctx.cluster_build().success);

    assert!(ctx.run(&["generate", "--config", "speedfog.toml"]).success);
    let first = ctx.read("graph.json");
    assert!(ctx.run(&["generate", "--config", "speedfog.toml"]).success);
    let second = ctx.read("graph.json");
    assert_eq!(first, second);
}

#[test]
fn test_generate_seed_override() {
    let ctx = TestContext::new();
    assert!(ctx.cluster_build().success);

    let out = ctx.run(&["generate", "--config", "speedfog.toml", "--seed", "7"]);
    assert!(out.success, "stderr: {}", out.stderr);
    let doc: serde_json::Value = serde_json::from_str(&ctx.read("graph.json")).unwrap();
    assert_eq!(doc["seed"], 7);
}

#[test]
fn test_generate_rejects_bad_config() {
    let ctx = TestContext::new();
    assert!(ctx.cluster_build().success);

    std::fs::write(
        ctx.dir.join("bad.toml"),
        "[structure]\nmajor_boss_ratio = 2.0",
    )
    .unwrap();
    let out = ctx.run(&["generate", "--config", "bad.toml"]);
    assert!(!out.success);
    assert!(out.stderr.contains("major_boss_ratio"));
}

#[test]
fn test_generate_missing_clusters_file() {
    let ctx = TestContext::new();
    let out = ctx.run(&["generate", "--config", "speedfog.toml"]);
    assert!(!out.success);
    assert!(out.stderr.contains("clusters.json"));
}

#[test]
fn test_generate_unsatisfiable_requirements() {
    let ctx = TestContext::new();
    assert!(ctx.cluster_build().success);

    std::fs::write(
        ctx.dir.join("greedy.toml"),
        r#"
seed = 0

[requirements]
legacy_dungeons = 3

[structure]
min_layers = 4
max_layers = 4
"#,
    )
    .unwrap();
    let out = ctx.run(&[
        "generate",
        "--config",
        "greedy.toml",
        "--max-attempts",
        "5",
    ]);
    assert!(!out.success);
    assert!(out.stderr.contains("no candidate"));
}
