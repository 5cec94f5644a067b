//! Shared test fixtures for resolution and refresh tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ConfigNode, ConfigNodeBuilder};
use crate::env::MapEnv;
use crate::param::{LoadError, LoadFuture, Loader, Param, ParamBuilder};

/// Records the values handed to parse functions, keyed by param name.
#[derive(Clone, Default)]
pub struct Store {
    values: Arc<Mutex<HashMap<String, String>>>,
    parse_calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl Store {
    /// A param builder whose parse function records into this store.
    pub fn param(&self, name: &str) -> ParamBuilder {
        let store = self.clone();
        let key = name.to_string();
        Param::builder(name, move |value| {
            store
                .values
                .lock()
                .unwrap()
                .insert(key.clone(), value.to_string());
            *store
                .parse_calls
                .lock()
                .unwrap()
                .entry(key.clone())
                .or_default() += 1;
            Ok(())
        })
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub fn parse_calls(&self, name: &str) -> usize {
        self.parse_calls
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

/// Loader returning scripted results in order; the last one repeats.
pub struct ScriptedLoader {
    results: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Result<String, String>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub fn new(results: Vec<Result<&str, &str>>) -> Self {
        Self {
            results: Mutex::new(
                results
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(Ok(String::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn returning(value: &str) -> Self {
        Self::new(vec![Ok(value)])
    }

    /// Shared counter of `load` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Loader for ScriptedLoader {
    fn load<'a>(&'a self, _cancel: &'a CancellationToken) -> LoadFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.results.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        };
        Box::pin(async move { result.map_err(LoadError::msg) })
    }
}

/// Records calls to a load error handler.
#[derive(Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<Vec<(String, u32, String)>>>,
}

impl ErrorLog {
    pub fn handler(&self) -> impl Fn(&str, u32, &ConfigError) + Send + Sync + 'static {
        let entries = Arc::clone(&self.entries);
        move |name, count, error| {
            entries
                .lock()
                .unwrap()
                .push((name.to_string(), count, error.to_string()));
        }
    }

    /// Consecutive error counts, in report order.
    pub fn counts(&self) -> Vec<u32> {
        self.entries.lock().unwrap().iter().map(|e| e.1).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.2.clone())
            .collect()
    }
}

/// Root builder with an empty environment and a silent error handler.
pub fn root_builder(env: MapEnv) -> ConfigNodeBuilder {
    ConfigNode::builder()
        .with_env_source(env)
        .with_load_error_handler(|_, _, _| {})
}

/// Builds a param, panicking on definition errors.
pub fn build(builder: ParamBuilder) -> Param {
    builder.build().unwrap()
}
