use pretty_assertions::assert_eq;
use sprig_beans::{AnnotationTable, BeanScanner, BeanWorkspace, JavaSource};
use sprig_config::AnnotationsConfig;

const MICRONAUT_STYLE: &str = r#"
    package app;

    import jakarta.inject.Singleton;
    import jakarta.inject.Inject;
    import jakarta.inject.Named;

    @Singleton
    @Named("primaryClock")
    class SystemClock implements Clock {}

    @Singleton
    class Scheduler {
        @Inject @Named("primaryClock") Clock clock;
    }
"#;

#[test]
fn replaced_tables_recognise_other_frameworks() {
    let config = AnnotationsConfig {
        extend_defaults: false,
        bean_definitions: vec!["jakarta.inject.Singleton".to_string()],
        injections: vec!["jakarta.inject.Inject".to_string()],
        qualifiers: vec!["jakarta.inject.Named".to_string()],
        ..AnnotationsConfig::default()
    };
    let workspace = BeanWorkspace::new(BeanScanner::new(AnnotationTable::from_config(&config)));
    workspace
        .update_source(&JavaSource::new("App.java", MICRONAUT_STYLE))
        .expect("scan");

    let snapshot = workspace.snapshot();
    let names: Vec<_> = snapshot.index().iter().map(|def| def.name.as_str()).collect();
    assert_eq!(names, vec!["systemClock", "scheduler"]);

    let injection = snapshot.injections().next().expect("field injection");
    let best = snapshot.resolve(injection);
    assert_eq!(best.best()[0].definition.name, "systemClock");
    assert_eq!(best.best()[0].score(), 100);
}

#[test]
fn spring_tables_ignore_unregistered_annotations() {
    let workspace = BeanWorkspace::default();
    workspace
        .update_source(&JavaSource::new("App.java", MICRONAUT_STYLE))
        .expect("scan");

    let snapshot = workspace.snapshot();
    assert!(snapshot.index().is_empty());
    // `@Inject` is a default injection marker even though `@Singleton` is not a bean marker.
    assert_eq!(snapshot.injection_count(), 1);
}

#[test]
fn simple_names_can_be_matched_without_imports() {
    let source = JavaSource::new(
        "Wild.java",
        "@Service class Wild { @Autowired Helper helper; }\n@Component class Helper {}\n",
    );
    let strict = BeanScanner::default().scan(&source).expect("scan");
    assert!(strict.definitions.is_empty());
    assert!(strict.injections.is_empty());

    let lenient = BeanScanner::new(AnnotationTable::spring().with_simple_name_matching(true))
        .scan(&source)
        .expect("scan");
    assert_eq!(lenient.definitions.len(), 2);
    assert_eq!(lenient.injections.len(), 1);
}
