use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn pomclean_cmd() -> Command {
    Command::cargo_bin("pomclean").unwrap()
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const ROOT_POM: &str = r#"<project>
    <groupId>com.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
    <packaging>pom</packaging>
    <modules>
        <module>core</module>
    </modules>
    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>org.slf4j</groupId>
                <artifactId>slf4j-api</artifactId>
                <version>2.0.13</version>
            </dependency>
            <dependency>
                <groupId>junit</groupId>
                <artifactId>junit</artifactId>
                <version>4.13.2</version>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>
"#;

const CORE_POM: &str = r#"<project>
    <parent>
        <groupId>com.example</groupId>
        <artifactId>root</artifactId>
        <version>1.0</version>
    </parent>
    <artifactId>core</artifactId>
    <dependencies>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
        </dependency>
    </dependencies>
</project>
"#;

fn tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("pom.xml"), ROOT_POM);
    write(&tmp.path().join("core/pom.xml"), CORE_POM);
    tmp
}

#[test]
fn test_clean_dep_mgt_prunes_unused_entries() {
    let tmp = tree();

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["clean-dep-mgt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("root: 2 -> 1 managed dependencies"));

    let clean = fs::read_to_string(tmp.path().join("target/clean.pom.xml")).unwrap();
    assert!(clean.contains("slf4j-api"));
    assert!(!clean.contains("junit"));
    assert!(clean.contains("<module>core</module>"));
}

#[test]
fn test_clean_dep_mgt_verbose_lists_members_and_removals() {
    let tmp = tree();

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["--verbose", "clean-dep-mgt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("root: core"))
        .stderr(predicate::str::contains("junit:junit"));
}

#[test]
fn test_clean_dep_mgt_custom_file_name() {
    let tmp = tree();

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["clean-dep-mgt", "--output-file-name", "mgt.pom.xml"])
        .assert()
        .success();

    assert!(tmp.path().join("target/mgt.pom.xml").is_file());
}

#[test]
fn test_clean_dep_mgt_fail_build() {
    let tmp = tree();
    fs::write(tmp.path().join("target"), "").unwrap();

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["clean-dep-mgt", "--fail-build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Failed to clean up the Dependency Management section.",
        ));

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["clean-dep-mgt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Potential problems found"));
}

#[test]
fn test_clean_dep_mgt_unsupported_structure() {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp.path().join("pom.xml"),
        "<project><artifactId>solo</artifactId></project>",
    );

    pomclean_cmd()
        .current_dir(tmp.path())
        .args(["clean-dep-mgt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not supported"));

    assert!(!tmp.path().join("target").exists());
}
