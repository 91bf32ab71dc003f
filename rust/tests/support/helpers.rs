#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cooked_core::{AppReconciler, AppUpdate, Toast};

pub fn wait_until(what: &str, timeout: Duration, f: impl FnMut() -> bool) {
    wait_until_with_poll(what, timeout, Duration::from_millis(20), f);
}

pub fn wait_until_with_poll(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut f: impl FnMut() -> bool,
) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        std::thread::sleep(poll);
    }
    panic!("{what}: condition not met within {timeout:?}");
}

pub fn write_config(data_dir: &str) {
    let path = std::path::Path::new(data_dir).join("cooked_config.json");
    let v = serde_json::json!({
        "disable_network": false,
        "request_timeout_secs": 5,
    });
    std::fs::write(path, serde_json::to_vec(&v).unwrap()).unwrap();
}

#[derive(Clone)]
pub struct Collector(pub Arc<Mutex<Vec<AppUpdate>>>);

impl Collector {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn revs(&self) -> Vec<u64> {
        self.0.lock().unwrap().iter().map(AppUpdate::rev).collect()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        let mut out: Vec<Toast> = Vec::new();
        for update in self.0.lock().unwrap().iter() {
            let AppUpdate::FullState(s) = update;
            if let Some(t) = &s.toast {
                if out.last() != Some(t) {
                    out.push(t.clone());
                }
            }
        }
        out
    }
}

impl AppReconciler for Collector {
    fn reconcile(&self, update: AppUpdate) {
        self.0.lock().unwrap().push(update);
    }
}
