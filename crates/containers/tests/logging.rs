#![cfg(feature = "logging")]

use std::io;
use std::sync::{Arc, Mutex};

use nebula_containers::allocator::{StackAllocator, StackStorage, SystemAllocator};
use nebula_containers::config::DequeConfig;
use nebula_containers::deque::Deque;
use nebula_containers::list::List;
use nebula_containers::shared::SharedPtr;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        let bytes = self.0.lock().map(|guard| guard.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut guard) = self.0.lock() {
            guard.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn container_events_reach_the_subscriber() {
    let capture = Capture::default();
    let writer = capture.clone();
    let _guard = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish()
        .set_default();

    let mut deque = Deque::with_config_in(DequeConfig::small(), SystemAllocator::new()).unwrap();
    for value in 0..256 {
        deque.push_back(value);
    }

    let list: List<u8> = (0..3).collect();
    let _copy = list.clone();

    drop(SharedPtr::new(1_u8));

    let storage = StackStorage::<32>::new();
    let mut arena_list = List::<[u8; 64], _>::try_new_in(StackAllocator::new(&storage)).unwrap();
    assert!(arena_list.try_push_back([0; 64]).is_err());

    let output = capture.contents();
    assert!(output.contains("deque block map grown"), "{output}");
    assert!(output.contains("list copy: selecting allocator"), "{output}");
    assert!(output.contains("destroying value"), "{output}");
    assert!(output.contains("releasing control block"), "{output}");
    assert!(output.contains("arena exhausted"), "{output}");
}
