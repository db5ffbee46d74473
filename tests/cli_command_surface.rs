use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use tempfile::tempdir;

fn launcher_bin() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_crisprseq-launch"));
    command
        .env_remove("FLYTE_INTERNAL_EXECUTION_ID")
        .env_remove("FLYTE_INTERNAL_EXECUTION_NAME");
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn spawn_provision_server(body: &'static str) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header line");
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().expect("content length");
            }
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        let mut payload = vec![0u8; content_length];
        reader.read_exact(&mut payload).expect("read body");
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream
            .write_all(response.as_bytes())
            .expect("write response");
    });
    (format!("http://{addr}/provision-storage"), handle)
}

#[test]
fn flags_prints_targeted_command_without_defaults() {
    let output = launcher_bin()
        .args([
            "flags",
            "--param",
            "outdir=latch:///out",
            "--param",
            "analysis=targeted",
            "--param",
            "protospacer=ACGT",
            "--param",
            "aligner=minimap2",
        ])
        .output()
        .expect("run flags");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("binary=/root/nextflow"));
    assert!(out.contains("working_directory=/nf-workdir"));
    assert!(out.contains(
        "command=/root/nextflow run /nf-workdir/main.nf -work-dir /nf-workdir -profile docker -c latch.config --outdir latch:///out --analysis targeted --protospacer ACGT\n"
    ));
    assert!(!out.contains("--aligner"));
}

#[test]
fn flags_reads_params_file_and_lets_cli_values_win() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("params.yaml");
    fs::write(
        &params,
        "outdir: \"latch:///out\"\nanalysis: screening\nmin_reads: 50\noverrepresented: true\numi_clustering: false\n",
    )
    .expect("write params");

    let output = launcher_bin()
        .args(["flags", "--params-file"])
        .arg(&params)
        .args(["--param", "min_reads=75"])
        .output()
        .expect("run flags");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("--analysis screening --overrepresented --min_reads 75.0\n"));
    assert!(!out.contains("--umi_clustering"));
}

#[test]
fn flags_rejects_missing_required_parameter() {
    let output = launcher_bin()
        .args(["flags", "--param", "analysis=targeted"])
        .output()
        .expect("run flags");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("required parameter `outdir` is missing"));
}

#[test]
fn run_without_execution_token_fails_before_provisioning() {
    let output = launcher_bin()
        .args([
            "run",
            "--param",
            "outdir=latch:///out",
            "--param",
            "analysis=targeted",
        ])
        .output()
        .expect("run");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to get execution token"));
    assert!(!stdout(&output).contains("Provisioning shared storage volume"));
}

#[test]
fn params_lists_catalog_sections() {
    let output = launcher_bin().arg("params").output().expect("run params");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("[Input/output options]"));
    assert!(out.contains("outdir"));
    assert!(out.contains("output directory"));
}

#[test]
fn unknown_command_exits_non_zero() {
    let output = launcher_bin().arg("deploy").output().expect("run");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown command `deploy`"));
}

#[test]
fn run_with_config_stages_launches_and_stores_log() {
    let (url, server) = spawn_provision_server(r#"{"name":"pvc-cli"}"#);
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    let image = root.join("image");
    fs::create_dir_all(&image).expect("image dir");
    fs::write(image.join("main.nf"), "workflow {}").expect("main.nf");
    write_script(
        &image.join("nextflow"),
        "#!/bin/sh\necho \"claim=$K8S_STORAGE_CLAIM_NAME\" > .nextflow.log\n",
    );

    let config = root.join("launcher.yaml");
    fs::write(
        &config,
        format!(
            "provisioner:\n  endpoint: {url}\n  timeout_secs: 5\nworkdir:\n  source_root: {image}\n  shared_dir: {shared}\npipeline:\n  binary: {binary}\nartifact_store:\n  kind: directory\n  root: {store}\nevent_log: {events}\n",
            image = image.display(),
            shared = root.join("nf-workdir").display(),
            binary = image.join("nextflow").display(),
            store = root.join("ldata").display(),
            events = root.join("events.log").display(),
        ),
    )
    .expect("write config");

    let output = launcher_bin()
        .env("FLYTE_INTERNAL_EXECUTION_ID", "tok-cli")
        .env("FLYTE_INTERNAL_EXECUTION_NAME", "run-cli")
        .args(["run", "--config"])
        .arg(&config)
        .args([
            "--param",
            "outdir=latch:///out",
            "--param",
            "analysis=targeted",
        ])
        .output()
        .expect("run");
    server.join().expect("server thread");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Provisioning shared storage volume... Done."));
    assert!(out.contains("Launching Nextflow Runtime"));
    assert!(out.contains("run=ok"));
    assert!(out.contains("pvc_name=pvc-cli"));
    assert!(out.contains("exit_code=0"));
    assert!(out.contains("log_upload=uploaded"));

    let stored = root.join("ldata/your_log_dir/nf_nf_core_crisprseq/run-cli/nextflow.log");
    assert_eq!(
        fs::read_to_string(stored).expect("stored log"),
        "claim=pvc-cli\n"
    );
}

#[test]
fn run_exits_with_pipeline_exit_code_after_storing_log() {
    let (url, server) = spawn_provision_server(r#"{"name":"pvc-fail"}"#);
    let dir = tempdir().expect("tempdir");
    let root = dir.path();
    let image = root.join("image");
    fs::create_dir_all(&image).expect("image dir");
    fs::write(image.join("main.nf"), "workflow {}").expect("main.nf");
    write_script(
        &image.join("nextflow"),
        "#!/bin/sh\necho \"ERROR ~ process failed\" > .nextflow.log\nexit 3\n",
    );

    let config = root.join("launcher.yaml");
    fs::write(
        &config,
        format!(
            "provisioner:\n  endpoint: {url}\n  timeout_secs: 5\nworkdir:\n  source_root: {image}\n  shared_dir: {shared}\npipeline:\n  binary: {binary}\nartifact_store:\n  kind: directory\n  root: {store}\nevent_log: {events}\n",
            image = image.display(),
            shared = root.join("nf-workdir").display(),
            binary = image.join("nextflow").display(),
            store = root.join("ldata").display(),
            events = root.join("events.log").display(),
        ),
    )
    .expect("write config");

    let output = launcher_bin()
        .env("FLYTE_INTERNAL_EXECUTION_ID", "tok-cli")
        .env("FLYTE_INTERNAL_EXECUTION_NAME", "run-fail")
        .args(["run", "--config"])
        .arg(&config)
        .args([
            "--param",
            "outdir=latch:///out",
            "--param",
            "analysis=targeted",
        ])
        .output()
        .expect("run");
    server.join().expect("server thread");

    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("pipeline process failed with exit code 3"));
    assert!(!stdout(&output).contains("run=ok"));
    let stored = root.join("ldata/your_log_dir/nf_nf_core_crisprseq/run-fail/nextflow.log");
    assert_eq!(
        fs::read_to_string(stored).expect("stored log"),
        "ERROR ~ process failed\n"
    );
}
