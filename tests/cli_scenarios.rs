//! End-to-end scenarios for the `flappy` binary, covering a clean build,
//! hierarchical override merging, bridged dependencies, cycle/conflict
//! detection, and incremental rebuilds. Scenarios that need to observe a
//! real compiled object skip (not fail) when no compiler is on PATH.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn have(tool: &str) -> bool {
    which::which(tool).is_ok()
}

fn flappy() -> Command {
    Command::cargo_bin("flappy").unwrap()
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn minimal_build_produces_object_and_binary_then_skips_on_rerun() {
    if !have("g++") {
        eprintln!("skipping: no g++ on PATH");
        return;
    }
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("flappy.toml"),
        r#"
        [package]
        name = "hello"

        [build]
        compiler = "g++"
        language = "c++"
        standard = "c++17"
        output = "bin/hello"
        arch = "x64"
        type = "exe"
        "#,
    );
    write(&tmp.path().join("src/main.cpp"), "int main(){return 0;}\n");

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .success();

    let obj = tmp.path().join("obj/x64/debug/main.cpp.o");
    assert!(obj.exists(), "expected {} to exist", obj.display());
    let bin_plain = tmp.path().join("bin/hello");
    let bin_exe = tmp.path().join("bin/hello.exe");
    assert!(bin_plain.exists() || bin_exe.exists());

    let obj_mtime_first = fs::metadata(&obj).unwrap().modified().unwrap();

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .success();

    let obj_mtime_second = fs::metadata(&obj).unwrap().modified().unwrap();
    assert_eq!(
        obj_mtime_first, obj_mtime_second,
        "second build must not recompile unchanged sources"
    );
}

#[test]
fn bridging_exposes_sibling_include_path_to_a_raw_dependency() {
    if !have("ar") {
        eprintln!("skipping: no ar on PATH");
        return;
    }
    let tmp = TempDir::new().unwrap();

    let openssl_dir = tmp.path().join("vendor/openssl");
    write(
        &openssl_dir.join("include/openssl.h"),
        "// marker header\n",
    );

    let curl_dir = tmp.path().join("vendor/curl");
    fs::create_dir_all(&curl_dir).unwrap();

    write(
        &tmp.path().join("flappy.toml"),
        &format!(
            r#"
            [package]
            name = "app"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/app"
            arch = "x64"
            type = "lib"

            [dependencies.curl]
            path = "{curl}"
            build_cmd = "echo FLAPPY_DEP_OPENSSL_INCLUDE=$FLAPPY_DEP_OPENSSL_INCLUDE > seen.txt"
            extra_dependencies = ["openssl"]

            [dependencies.openssl]
            path = "{openssl}"
            build_cmd = "true"
            "#,
            curl = curl_dir.display(),
            openssl = openssl_dir.display(),
        ),
    );

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .success();

    let seen = fs::read_to_string(curl_dir.join("seen.txt")).unwrap();
    assert!(
        seen.contains("include"),
        "openssl's include dir was not bridged into curl's build env: {seen}"
    );
}

#[test]
fn dependency_cycle_through_bridging_is_a_fatal_error() {
    let tmp = TempDir::new().unwrap();
    let b_dir = tmp.path().join("vendor/b");
    write(
        &b_dir.join("flappy.toml"),
        r#"
        [package]
        name = "b"

        [build]
        compiler = "g++"
        language = "c++"
        standard = "c++17"
        output = "bin/b"
        arch = "x64"
        type = "lib"

        [dependencies.a]
        path = "../a"
        "#,
    );
    let a_dir = tmp.path().join("vendor/a");
    fs::create_dir_all(&a_dir).unwrap();

    write(
        &tmp.path().join("flappy.toml"),
        &format!(
            r#"
            [package]
            name = "app"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/app"
            arch = "x64"
            type = "exe"

            [dependencies.a]
            path = "{a}"
            extra_dependencies = ["b"]

            [dependencies.b]
            path = "{b}"
            "#,
            a = a_dir.display(),
            b = b_dir.display(),
        ),
    );

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle").or(predicate::str::contains("Cycle")));
}

#[test]
fn conflicting_sources_for_the_same_dependency_name_is_a_fatal_error() {
    let tmp = TempDir::new().unwrap();

    // `fmt` is reached twice under the same name, through two different
    // sub-manifests, pointing at two different on-disk paths. Neither
    // `left` nor `right` names `fmt` directly; each brings it in as a
    // native dependency of its own manifest.
    let fmt_a = tmp.path().join("vendor/fmt-a");
    let fmt_b = tmp.path().join("vendor/fmt-b");
    fs::create_dir_all(&fmt_a).unwrap();
    fs::create_dir_all(&fmt_b).unwrap();

    let left_dir = tmp.path().join("vendor/left");
    write(
        &left_dir.join("flappy.toml"),
        &format!(
            r#"
            [package]
            name = "left"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/left"
            arch = "x64"
            type = "lib"

            [dependencies.fmt]
            path = "{fmt_a}"
            "#,
            fmt_a = fmt_a.display(),
        ),
    );

    let right_dir = tmp.path().join("vendor/right");
    write(
        &right_dir.join("flappy.toml"),
        &format!(
            r#"
            [package]
            name = "right"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/right"
            arch = "x64"
            type = "lib"

            [dependencies.fmt]
            path = "{fmt_b}"
            "#,
            fmt_b = fmt_b.display(),
        ),
    );

    write(
        &tmp.path().join("flappy.toml"),
        &format!(
            r#"
            [package]
            name = "app"

            [build]
            compiler = "g++"
            language = "c++"
            standard = "c++17"
            output = "bin/app"
            arch = "x64"
            type = "exe"

            [dependencies.left]
            path = "{left}"

            [dependencies.right]
            path = "{right}"
            "#,
            left = left_dir.display(),
            right = right_dir.display(),
        ),
    );

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict").or(predicate::str::contains("Conflict")));
}

#[test]
fn override_merge_prefers_release_over_debug_defines() {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("flappy.toml"),
        r#"
        [package]
        name = "hello"

        [build]
        compiler = "g++"
        language = "c++"
        standard = "c++17"
        output = "bin/hello"
        arch = "x64"
        type = "exe"
        defines = ["A"]

        [build.release]
        defines = ["B"]
        "#,
    );
    write(&tmp.path().join("src/main.cpp"), "int main(){return 0;}\n");

    if !have("g++") {
        eprintln!("skipping: no g++ on PATH");
        return;
    }

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .arg("--release")
        .assert()
        .success();

    let db = fs::read_to_string(tmp.path().join("compile_commands.json")).unwrap();
    assert!(db.contains("-DA"));
    assert!(db.contains("-DB"));
}

#[test]
fn touching_one_source_recompiles_only_that_file() {
    if !have("g++") {
        eprintln!("skipping: no g++ on PATH");
        return;
    }
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("flappy.toml"),
        r#"
        [package]
        name = "hello"

        [build]
        compiler = "g++"
        language = "c++"
        standard = "c++17"
        output = "bin/hello"
        arch = "x64"
        type = "exe"
        "#,
    );
    write(&tmp.path().join("src/main.cpp"), "int f(); int main(){return f();}\n");
    write(&tmp.path().join("src/util.cpp"), "int f(){return 0;}\n");

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .success();

    let main_obj = tmp.path().join("obj/x64/debug/main.cpp.o");
    let util_obj = tmp.path().join("obj/x64/debug/util.cpp.o");
    let util_mtime_before = fs::metadata(&util_obj).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    write(&tmp.path().join("src/main.cpp"), "int f(); int main(){return f()+0;}\n");

    flappy()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .success();

    let main_mtime_after = fs::metadata(&main_obj).unwrap().modified().unwrap();
    let util_mtime_after = fs::metadata(&util_obj).unwrap().modified().unwrap();
    assert!(main_mtime_after > util_mtime_before);
    assert_eq!(util_mtime_before, util_mtime_after, "untouched source must not recompile");
}
