use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use walkdir::WalkDir;

const EXPECT: &str = "// expect: ";
const EXPECT_RUNTIME_ERROR: &str = "// expect runtime error: ";
const EXPECT_ERROR: &str = "// expect error: ";

/// What a script declares about its own run.
#[derive(Debug, Default)]
struct Expectations {
    stdout: Vec<String>,
    stderr: Vec<String>,
    status: i32,
}

#[test]
fn run_all_files() {
    let dir = "./tests/data/";

    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|o| o.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "lox"));

    let mut count = 0;

    for entry in entries {
        let filename = entry.path();

        print!("{} ... ", filename.display());

        let expected = find_expects(filename);
        let output = run_file(filename);

        let stdout = String::from_utf8(output.stdout).unwrap();
        let stdout = stdout.trim_end();

        let stderr = String::from_utf8(output.stderr).unwrap();
        let stderr = stderr.trim_end();

        assert_eq!(
            expected.stdout.join("\n"),
            stdout,
            "{}: stdout={}, stderr={}",
            filename.display(),
            stdout,
            stderr
        );

        for message in &expected.stderr {
            assert!(
                stderr.contains(message.as_str()),
                "{}: expected stderr to contain {:?}, got {:?}",
                filename.display(),
                message,
                stderr
            );
        }

        assert_eq!(
            Some(expected.status),
            output.status.code(),
            "{}: stderr={}",
            filename.display(),
            stderr
        );

        println!("OK");
        count += 1;
    }

    assert!(count > 0, "no scripts found under {}", dir);
}

fn run_file(filename: &Path) -> Output {
    let mut cmd = Command::cargo_bin("rox").unwrap();
    cmd.arg("run").arg(filename).output().unwrap()
}

fn find_expects(filename: &Path) -> Expectations {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let mut result = Expectations::default();

    for line in content.lines() {
        if let Some((_, target)) = line.split_once(EXPECT) {
            result.stdout.push(target.into());
        } else if let Some((_, target)) = line.split_once(EXPECT_RUNTIME_ERROR) {
            result.stderr.push(target.into());
            result.status = 70;
        } else if let Some((_, target)) = line.split_once(EXPECT_ERROR) {
            result.stderr.push(target.into());
            result.status = 65;
        }
    }

    result
}
