use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sprig_beans::{BeanWorkspace, JavaSource};

fn version(n: usize) -> JavaSource {
    JavaSource::new(
        "Gen.java",
        format!(
            "import org.springframework.stereotype.Component;\n@Component(\"gen{n}\") class Gen{n} implements Marker {{}}\n"
        ),
    )
}

#[test]
fn readers_never_observe_half_applied_replacements() {
    let workspace = Arc::new(BeanWorkspace::default());
    workspace
        .update_source(&JavaSource::new(
            "Stable.java",
            "import org.springframework.stereotype.Component;\n@Component class Stable {}\n",
        ))
        .expect("scan");
    workspace.update_source(&version(0)).expect("scan");

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let workspace = Arc::clone(&workspace);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut observed = 0usize;
                while !done.load(Ordering::Acquire) || observed == 0 {
                    let snapshot = workspace.snapshot();
                    assert_eq!(snapshot.index().len(), 2);
                    assert_eq!(snapshot.index().definitions_in_file("Gen.java").count(), 1);
                    assert_eq!(snapshot.index().definitions_of_type("Marker").len(), 1);
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for n in 1..200 {
        workspace.update_source(&version(n)).expect("scan");
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().expect("reader thread") > 0);
    }
    let names: Vec<_> = workspace
        .snapshot()
        .index()
        .iter()
        .map(|def| def.name.clone())
        .collect();
    assert_eq!(names, vec!["gen199".to_string(), "stable".to_string()]);
}
