/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mmv() -> Command {
    Command::cargo_bin("mmv").unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

fn names(dir: &TempDir) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

fn p(dir: &TempDir, name: &str) -> String {
    format!("{}/{}", dir.path().display(), name)
}

#[test]
fn rename_by_pattern() {
    let tmp = TempDir::new().unwrap();
    for n in ["one.txt", "two.txt", "three.txt"] {
        write(&tmp, n, n);
    }
    mmv()
        .args([&p(&tmp, "*.txt"), &p(&tmp, "#1.TXT")])
        .assert()
        .success();
    assert_eq!(vec!["one.TXT", "three.TXT", "two.TXT"], names(&tmp));
}

#[test]
fn no_match_exits_1() {
    let tmp = TempDir::new().unwrap();
    mmv()
        .args([&p(&tmp, "*.nope"), &p(&tmp, "#1.x")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no match."));
}

#[test]
fn verbose_reports_each_operation() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.log", "x");
    mmv()
        .args(["-v", &p(&tmp, "*.log"), &p(&tmp, "#1.old")])
        .assert()
        .success()
        .stdout(predicate::str::contains(" : done"));
    assert_eq!(vec!["a.old"], names(&tmp));
}

#[test]
fn no_execute_reports_but_leaves_files_alone() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.log", "x");
    mmv()
        .args(["-n", &p(&tmp, "*.log"), &p(&tmp, "#1.old")])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.log"));
    assert_eq!(vec!["a.log"], names(&tmp));
}

#[test]
fn collision_reports_all_sources_and_exits_1() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "x", "X");
    write(&tmp, "y", "Y");
    let stream = format!("{0}\0{1}\0{2}\0{1}\0", p(&tmp, "x"), p(&tmp, "z"), p(&tmp, "y"));
    mmv()
        .arg("-Z")
        .write_stdin(stream.into_bytes())
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("collision.")
                .and(predicate::str::contains(p(&tmp, "x")))
                .and(predicate::str::contains(p(&tmp, "y"))),
        );
    assert_eq!(vec!["x", "y"], names(&tmp));
}

#[test]
fn cycle_swap_via_nul_pairs() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a", "A");
    write(&tmp, "b", "B");
    let stream = format!(
        "{0}\0{1}\0{1}\0{0}\0",
        p(&tmp, "a"),
        p(&tmp, "b")
    );
    mmv()
        .arg("-Z")
        .write_stdin(stream.into_bytes())
        .assert()
        .success();
    assert_eq!("B", read(&tmp, "a"));
    assert_eq!("A", read(&tmp, "b"));
    assert_eq!(vec!["a", "b"], names(&tmp));
}

#[test]
fn classic_stdin_pairs_with_delete_flag() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "src", "NEW");
    write(&tmp, "old", "OLD");
    let stream = format!("{} -> {} (*)\n", p(&tmp, "src"), p(&tmp, "old"));
    mmv().arg("-p").write_stdin(stream).assert().success();
    assert_eq!(vec!["old"], names(&tmp));
    assert_eq!("NEW", read(&tmp, "old"));
}

#[test]
fn first_op_switch_on_the_command_line_wins() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "src", "tail");
    write(&tmp, "dst", "head-");
    // -a comes first, so this appends; a copy would have replaced dst
    mmv()
        .args(["-a", "-c", &p(&tmp, "src"), &p(&tmp, "dst")])
        .assert()
        .success();
    assert_eq!("head-tail", read(&tmp, "dst"));
    assert_eq!("tail", read(&tmp, "src"));
}

#[test]
fn append_op_concatenates() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "src", "tail");
    write(&tmp, "dst", "head-");
    mmv()
        .args(["-a", &p(&tmp, "src"), &p(&tmp, "dst")])
        .assert()
        .success();
    assert_eq!("head-tail", read(&tmp, "dst"));
}

#[test]
fn copy_op_keeps_source() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "src", "S");
    mmv()
        .args(["-c", &p(&tmp, "src"), &p(&tmp, "dup")])
        .assert()
        .success();
    assert_eq!(vec!["dup", "src"], names(&tmp));
}

#[test]
fn overlapping_copy_targets_are_rejected_as_chains() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a", "A");
    write(&tmp, "b", "B");
    let stream = format!(
        "{0}\0{1}\0{1}\0{2}\0",
        p(&tmp, "a"),
        p(&tmp, "b"),
        p(&tmp, "c")
    );
    mmv()
        .args(["-c", "-Z", "-d"])
        .write_stdin(stream.into_bytes())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no chain copies allowed."));
    assert_eq!("A", read(&tmp, "a"));
    assert_eq!("B", read(&tmp, "b"));
}

#[test]
fn no_delete_policy_refuses_to_displace() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "src", "NEW");
    write(&tmp, "dst", "OLD");
    mmv()
        .args(["-p", &p(&tmp, "src"), &p(&tmp, "dst")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("would have to be deleted."));
    assert_eq!("OLD", read(&tmp, "dst"));
}

#[test]
fn unknown_switch_prints_usage_and_exits_1() {
    mmv().arg("-q").assert().code(1);
}

#[test]
fn lone_from_argument_is_an_error() {
    mmv().arg("onlyfrom").assert().code(1);
}

#[test]
fn hardlink_op_links() {
    use std::os::unix::fs::MetadataExt;
    let tmp = TempDir::new().unwrap();
    write(&tmp, "orig", "O");
    mmv()
        .args(["-l", &p(&tmp, "orig"), &p(&tmp, "ln")])
        .assert()
        .success();
    let a = fs::metadata(tmp.path().join("orig")).unwrap().ino();
    let b = fs::metadata(tmp.path().join("ln")).unwrap().ino();
    assert_eq!(a, b);
}

#[test]
fn dirmove_renames_within_directory() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "report-final", "R");
    mmv()
        .args(["-r", &p(&tmp, "report-*"), "#1"])
        .assert()
        .success();
    assert_eq!(vec!["final"], names(&tmp));
}

#[test]
fn case_fold_backreference() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "apple", "a");
    write(&tmp, "orange", "o");
    mmv()
        .args(["-h", &p(&tmp, "[aeiou]*"), &p(&tmp, "#u1-#2")])
        .assert()
        .success();
    assert_eq!(vec!["A-pple", "O-range"], names(&tmp));
}

#[test]
fn debug_switch_dumps_structures() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "d.txt", "x");
    mmv()
        .args(["-D", "-n", &p(&tmp, "*.txt"), &p(&tmp, "#1.y")])
        .assert()
        .success()
        .stderr(predicate::str::contains("replacement structures"));
}

#[test]
fn mmv_debug_env_selects_dump_file() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "d.txt", "x");
    let dump = tmp.path().join("dump.log");
    mmv()
        .env("MMV_DEBUG", dump.to_str().unwrap())
        .args(["-n", &p(&tmp, "*.txt"), &p(&tmp, "#1.y")])
        .assert()
        .success();
    let logged = fs::read_to_string(&dump).unwrap();
    assert!(logged.contains("replacement structures"));
}
