use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use nova_delegate::preview;

use super::fixtures::{naming, strict, Fixture, ZOO};

#[derive(Clone, Default)]
struct SharedLogBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedLogBuffer {
    fn as_string(&self) -> String {
        let bytes = self.0.lock().expect("log buffer mutex poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

impl io::Write for SharedLogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn preview_renders_diffs_without_touching_the_workspace() {
    let fx = Fixture::new(ZOO);
    let (target, records) = fx.scan("Dog", "Animal");
    let surface = strict().forward(fx.method("Animal", "speak"));
    let before = fx.workspace.clone();

    let preview = preview(
        &fx.workspace,
        &fx.program,
        &target,
        &records,
        &surface,
        &naming("Animal"),
    )
    .expect("preview succeeds");

    assert_eq!(fx.workspace, before);
    assert_eq!(preview.files.len(), 1);
    let dog = &preview.files[0];
    assert_eq!(dog.file.as_str(), "Dog.java");
    assert_eq!(dog.original, fx.print("Dog.java"));
    assert!(dog.modified.starts_with("class Dog {\n"));
    assert!(dog.unified_diff.contains("-class Dog extends Animal {"), "{}", dog.unified_diff);
    assert!(dog.unified_diff.contains("+class Dog {"), "{}", dog.unified_diff);
    assert!(dog
        .unified_diff
        .contains("+        return animal.speak();"));
    assert_eq!(preview.report.forwarders, vec!["speak".to_string()]);
}

#[test]
fn failed_previews_are_logged_as_warnings() {
    let fx = Fixture::new(ZOO);
    let (target, records) = fx.scan("Dog", "Animal");
    let logs = SharedLogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();

    // `Puppy` reaches `speak` through `super`, which needs a forwarder or an accessor.
    let result = tracing::subscriber::with_default(subscriber, || {
        preview(
            &fx.workspace,
            &fx.program,
            &target,
            &records,
            &strict(),
            &naming("Animal"),
        )
    });

    assert!(result.is_err());
    let text = logs.as_string();
    assert!(
        text.contains("delegation aborted; workspace left unchanged"),
        "expected an abort warning, got:\n{text}"
    );
}
