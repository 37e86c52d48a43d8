use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dqm"))
}

fn fixtures() -> PathBuf {
    // crates/dqm-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").canonicalize().unwrap()
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("dqm_cli_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "dqm {:?} failed, stderr={}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be JSON")
}

#[test]
fn jet_monitor_counts_protocol_outcomes() {
    let dir = fixtures();
    let config = dir.join("jet_monitor.yaml");
    let events = dir.join("jet_events.jsonl");
    let v = run_json(&[
        "jet",
        "--config",
        config.to_str().unwrap(),
        "--events",
        events.to_str().unwrap(),
    ]);

    assert_eq!(v["monitor"], "jet");
    assert_eq!(v["collection"], "PfJets");
    assert_eq!(v["loop"]["events"], 7);
    assert_eq!(v["loop"]["runs"], 1);
    assert_eq!(v["loop"]["lumis"], 2);

    let stats = &v["stats"];
    assert_eq!(stats["denominator"], 3);
    assert_eq!(stats["numerator"], 2);
    assert_eq!(stats["rejected_gate"], 1);
    assert_eq!(stats["rejected_empty"], 1);
    assert_eq!(stats["rejected_too_few"], 1);
    assert_eq!(stats["rejected_invalid"], 1);

    let elements = v["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 8 * 7 * 2);
    assert!(elements.iter().all(|e| e["path"].as_str().unwrap().starts_with("HLT/JetMET/PFJet40/")));
    assert!(elements.iter().all(|e| e.get("element").is_none()));

    let curves = v["efficiencies"].as_array().unwrap();
    let pt = curves.iter().find(|c| c["name"] == "pfjetpT").unwrap();
    let filled: Vec<_> = pt["points"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["total"].as_f64().unwrap() > 0.0)
        .collect();
    assert_eq!(filled.len(), 3);
    let passed: f64 = filled.iter().map(|p| p["passed"].as_f64().unwrap()).sum();
    assert_eq!(passed, 2.0);
}

#[test]
fn jet_monitor_parallel_matches_serial() {
    let dir = fixtures();
    let config = dir.join("jet_monitor.yaml");
    let events = dir.join("jet_events.jsonl");
    let args = |threads: &'static str| {
        vec![
            "jet".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--events".to_string(),
            events.display().to_string(),
            "--threads".to_string(),
            threads.to_string(),
        ]
    };
    let serial_args = args("1");
    let parallel_args = args("3");
    let serial = run_json(&serial_args.iter().map(String::as_str).collect::<Vec<_>>());
    let parallel = run_json(&parallel_args.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(serial["stats"], parallel["stats"]);
    assert_eq!(serial["elements"], parallel["elements"]);
    assert_eq!(serial["efficiencies"], parallel["efficiencies"]);
    assert_eq!(serial["loop"], parallel["loop"]);
}

#[test]
fn strips_monitor_writes_output_file() {
    let dir = fixtures();
    let out_dir = tmp_dir("strips");
    let out = out_dir.join("summary.json");
    let result = run(&[
        "strips",
        "--geometry",
        dir.join("gem_geometry.yaml").to_str().unwrap(),
        "--events",
        dir.join("gem_events.jsonl").to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
        "--dump-elements",
    ]);
    assert!(result.status.success(), "stderr={}", String::from_utf8_lossy(&result.stderr));

    let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(v["monitor"], "strips");
    assert_eq!(v["strips_filled"], 6);
    assert_eq!(v["events_skipped"], 1);
    assert_eq!(v["chambers"].as_array().unwrap().len(), 3);

    let elements = v["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 6);
    let first = &elements[0];
    assert_eq!(first["path"], "GEM/recHit/StripFired_Gemini_1_la_1");
    assert_eq!(first["entries"], 3);
    assert_eq!(first["element"]["data"]["kind"], "h2");

    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn missing_events_file_fails() {
    let out = run(&["jet", "--events", "/nonexistent/events.jsonl"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("reading events"));
}
