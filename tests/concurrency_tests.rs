/// The lazy build runs at most once, however many threads race for it
use dummy_mock::backend::{CompileDiagnostic, CompileDiagnostics, SynthesizedType};
use dummy_mock::{
    contract, BuildState, DispatchBackend, Definition, Mock, MockError, MockOptions,
    ReferenceSet, SynthesisBackend,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[contract]
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Counts builds and slows them down so racing callers overlap.
#[derive(Default)]
struct CountingBackend {
    builds: AtomicUsize,
    fail: bool,
}

impl SynthesisBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn compile(
        &self,
        definition: &Definition,
        references: &ReferenceSet,
    ) -> Result<Arc<SynthesizedType>, CompileDiagnostics> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        if self.fail {
            return Err(CompileDiagnostics {
                type_name: definition.type_name.clone(),
                diagnostics: vec![CompileDiagnostic::new("backend unavailable")],
            });
        }
        DispatchBackend.compile(definition, references)
    }
}

const THREADS: usize = 8;

#[test]
fn test_concurrent_first_access_builds_once() {
    let backend = Arc::new(CountingBackend::default());
    let mock = Mock::<dyn Clock>::with_options(
        MockOptions::default().with_shared_backend(backend.clone()),
    );
    mock.setup(ClockOp::Now, || 1_700_000_000_u64);
    let barrier = Barrier::new(THREADS);

    let objects: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    mock.object().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(backend.builds.load(Ordering::SeqCst), 1);
    assert!(objects.iter().all(|o| Arc::ptr_eq(o, &objects[0])));
    assert_eq!(objects[0].now(), 1_700_000_000);
}

#[test]
fn test_concurrent_failure_is_shared_and_replayed() {
    let backend = Arc::new(CountingBackend {
        builds: AtomicUsize::new(0),
        fail: true,
    });
    let mock = Mock::<dyn Clock>::with_options(
        MockOptions::default().with_shared_backend(backend.clone()),
    );
    let barrier = Barrier::new(THREADS);

    let errors: Vec<MockError> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    mock.object().err().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(backend.builds.load(Ordering::SeqCst), 1);
    assert!(errors.iter().all(|e| e == &errors[0]));
    assert!(matches!(&errors[0], MockError::Synthesis(msg) if msg.contains("backend unavailable")));

    // Failed is terminal: no retry, same error
    assert_eq!(mock.state(), BuildState::Failed);
    assert_eq!(mock.object().err(), Some(errors[0].clone()));
    assert_eq!(backend.builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_setups_from_other_threads_reach_the_object() {
    let mock = Arc::new(Mock::<dyn Clock>::new());
    let object = mock.object().unwrap();

    let writer = {
        let mock = mock.clone();
        thread::spawn(move || {
            mock.setup(ClockOp::Now, || 5_u64);
        })
    };
    writer.join().unwrap();

    assert_eq!(object.now(), 5);
}
