use std::io::Write;
use std::process::Command;

fn rankflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rankflow"))
}

#[test]
fn no_arguments_is_a_usage_error() {
    let out = rankflow().output().unwrap();
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.is_empty());
}

#[test]
fn one_argument_is_a_usage_error() {
    let out = rankflow().arg("links.txt").output().unwrap();
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn prints_one_line_per_ranked_node() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "A B\nA C").unwrap();

    let out = rankflow().arg(file.path()).arg("1").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout, "B has rank: 0.575.\nC has rank: 0.575.\n");
}

#[test]
fn greedy_scheduler_with_partitions() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "A B\nB C\nC A").unwrap();

    let out = rankflow()
        .arg(file.path())
        .args(["3", "--scheduler", "greedy", "--threads", "2", "--partitions", "4"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let lines: Vec<String> = String::from_utf8(out.stdout).unwrap()
        .lines().map(|l| l.to_owned()).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("A has rank: "));
}

#[test]
fn malformed_input_fails_with_message() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "A B\nlonely").unwrap();

    let out = rankflow().arg(file.path()).arg("1").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.starts_with("error: "), "{}", stderr);
    assert!(stderr.contains("lonely"), "{}", stderr);
}
