use pretty_assertions::assert_eq;
use sprig_beans::{
    BeanWorkspace, InjectionKind, JavaSource, MatchReason, ResolutionOutcome, ScanOutcome,
    SPRIG_AMBIGUOUS_BEAN,
};
use tempfile::TempDir;

fn write(dir: &TempDir, rel: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, text).expect("write");
    path
}

#[test]
fn single_repository_implementation_satisfies_constructor_injection() {
    let dir = TempDir::new().expect("tempdir");
    let paths = vec![
        write(
            &dir,
            "com/app/UserRepository.java",
            "package com.app;\npublic interface UserRepository {}\n",
        ),
        write(
            &dir,
            "com/app/jpa/JpaUserRepository.java",
            r#"package com.app.jpa;

import com.app.UserRepository;
import org.springframework.stereotype.Repository;

@Repository
public class JpaUserRepository implements UserRepository {}
"#,
        ),
        write(
            &dir,
            "com/app/UserService.java",
            r#"package com.app;

import org.springframework.stereotype.Service;

@Service
public class UserService {
    private final UserRepository users;

    public UserService(UserRepository users) {
        this.users = users;
    }
}
"#,
        ),
    ];
    let sources: Vec<JavaSource> = paths
        .iter()
        .map(|path| JavaSource::read(path).expect("read"))
        .collect();

    let workspace = BeanWorkspace::default();
    let ticket = workspace.begin_full_scan();
    assert!(matches!(
        workspace.full_scan(&ticket, &sources),
        ScanOutcome::Committed { files: 3, failed: 0, .. }
    ));

    let snapshot = workspace.snapshot();
    let injection = snapshot.injections().next().expect("constructor injection").clone();
    assert_eq!(injection.kind, InjectionKind::ConstructorParameter);
    assert_eq!(injection.owner, "com.app.UserService");

    let resolution = snapshot.resolve(&injection);
    assert_eq!(resolution.outcome(), ResolutionOutcome::Unique);
    let best = &resolution.best()[0];
    assert_eq!(best.definition.name, "jpaUserRepository");
    assert_eq!(best.definition.ty, "com.app.jpa.JpaUserRepository");
    assert_eq!(best.result.reason, Some(MatchReason::TypeMatch));
    assert!(snapshot.diagnostics().is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = JavaSource::read(&dir.path().join("Missing.java")).expect_err("missing file");
    assert!(err.to_string().starts_with("failed to read"), "{err}");
}

#[test]
fn competing_implementations_are_ambiguous_until_one_is_primary() {
    let workspace = BeanWorkspace::default();
    let consumer = r#"
        package app;
        import org.springframework.beans.factory.annotation.Autowired;
        class Report {
            @Autowired Formatter formatter;
        }
    "#;
    for (file, text) in [
        (
            "Csv.java",
            "package app;\n@org.springframework.stereotype.Component class CsvFormatter implements Formatter {}\n",
        ),
        (
            "Json.java",
            "package app;\n@org.springframework.stereotype.Component class JsonFormatter implements Formatter {}\n",
        ),
        ("Report.java", consumer),
    ] {
        workspace
            .update_source(&JavaSource::new(file, text))
            .expect("scan");
    }

    let diagnostics = workspace.snapshot().diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].diagnostic.code, SPRIG_AMBIGUOUS_BEAN);
    assert!(diagnostics[0].diagnostic.message.contains("csvFormatter, jsonFormatter"));

    workspace
        .update_source(&JavaSource::new(
            "Json.java",
            "package app;\n@org.springframework.stereotype.Component @org.springframework.context.annotation.Primary class JsonFormatter implements Formatter {}\n",
        ))
        .expect("scan");
    assert!(workspace.snapshot().diagnostics().is_empty());
}
