//! Pipeline registry: at most one active pipeline per process.
//!
//! Constructing a pipeline loads a model onto a device, so only one language is
//! kept resident. A request for a different language tears the current pipeline
//! down and builds a replacement. Requests for two languages arriving together
//! therefore serialize on reconstruction instead of holding both models.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::Device;
use crate::error::{Result, TtsError};

use super::pipeline::{Pipeline, PipelineFactory};

/// Shared handle to a constructed pipeline.
///
/// The handle owns the pipeline; device resources are released when the last
/// handle is dropped, i.e. once the registry has replaced it and every request
/// still using it has finished.
pub struct PipelineHandle {
    id: u64,
    pipeline: Box<dyn Pipeline>,
    /// Serializes generation: the model is not assumed to be reentrant.
    generation: Mutex<()>,
}

impl PipelineHandle {
    fn new(id: u64, pipeline: Box<dyn Pipeline>) -> Self {
        Self { id, pipeline, generation: Mutex::new(()) }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(pipeline: impl Pipeline + 'static) -> Self {
        Self::new(0, Box::new(pipeline))
    }

    /// Construction sequence number, unique within a registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn language_code(&self) -> &str {
        self.pipeline.language_code()
    }

    pub fn device(&self) -> Device {
        self.pipeline.device()
    }

    pub(crate) fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    /// Acquire exclusive use of the pipeline for one synthesis.
    pub(crate) fn lock_generation(&self) -> MutexGuard<'_, ()> {
        self.generation.lock()
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        debug!("Releasing pipeline #{} ({} on {})", self.id, self.pipeline.language_code(), self.pipeline.device());
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("id", &self.id)
            .field("language_code", &self.language_code())
            .field("device", &self.device())
            .finish()
    }
}

/// Owns the active pipeline and decides when to replace it.
pub struct PipelineRegistry {
    factory: Box<dyn PipelineFactory>,
    active: Mutex<Option<Arc<PipelineHandle>>>, // Active pipeline, guarded for check-and-swap
    next_id: AtomicU64,
}

impl PipelineRegistry {
    pub fn new(factory: Box<dyn PipelineFactory>) -> Self {
        Self { factory, active: Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    /// Return the active pipeline for `language_code`, constructing it if needed.
    ///
    /// The check, teardown, construction and swap all happen under one lock, so
    /// concurrent callers never observe a half-built pipeline and never build two.
    /// The registry releases its reference to the previous pipeline before the
    /// replacement is built, so it never holds two. Requests still using the old
    /// pipeline keep it alive until they finish. If construction fails the
    /// registry is left empty and the next call retries.
    ///
    /// # Errors
    /// Returns `TtsError::PipelineInitialization` if the factory fails.
    pub fn ensure(&self, language_code: &str, device: Device) -> Result<Arc<PipelineHandle>> {
        let mut active = self.active.lock();

        if let Some(handle) = active.as_ref()
            && handle.language_code() == language_code
            && handle.device() == device
        {
            return Ok(handle.clone());
        }

        if let Some(previous) = active.take() {
            info!("Language changed {} -> {}, replacing pipeline #{}", previous.language_code(), language_code, previous.id());
            drop(previous);
        }

        let started = Instant::now();
        info!("Constructing pipeline for language '{}' on {}", language_code, device);

        let pipeline = self.factory.construct(language_code, device).map_err(|source| {
            warn!("Pipeline construction for '{}' failed: {}", language_code, source);
            TtsError::PipelineInitialization { language_code: language_code.to_string(), source }
        })?;

        let handle = Arc::new(PipelineHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed), pipeline));
        info!("Pipeline #{} ready in {:.2}s", handle.id(), started.elapsed().as_secs_f32());

        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Language code of the active pipeline, if any.
    pub fn active_language(&self) -> Option<String> {
        self.active.lock().as_ref().map(|handle| handle.language_code().to_string())
    }

    /// Drop the active pipeline, if any.
    pub fn release(&self) {
        if let Some(previous) = self.active.lock().take() {
            info!("Releasing active pipeline #{}", previous.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::tts::testing::{StubFactory, StubPipeline};

    #[test]
    fn test_same_language_reuses_pipeline() {
        let factory = StubFactory::new(|lang, device| Ok(StubPipeline::new(lang, device, vec![100])));
        let constructed = factory.constructed();
        let registry = PipelineRegistry::new(Box::new(factory));

        let first = registry.ensure("a", Device::Cpu).unwrap();
        let second = registry.ensure("a", Device::Cpu).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_language_change_replaces_pipeline() {
        let factory = StubFactory::new(|lang, device| Ok(StubPipeline::new(lang, device, vec![100])));
        let constructed = factory.constructed();
        let dropped = factory.dropped();
        let registry = PipelineRegistry::new(Box::new(factory));

        let first = registry.ensure("a", Device::Cpu).unwrap();
        let first_id = first.id();
        drop(first);

        let second = registry.ensure("b", Device::Cpu).unwrap();
        assert_ne!(second.id(), first_id);
        assert_eq!(second.language_code(), "b");
        assert_eq!(registry.active_language().as_deref(), Some("b"));
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
        // The first pipeline was released once nothing else held it
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replaced_pipeline_lives_until_last_user_finishes() {
        let factory = StubFactory::new(|lang, device| Ok(StubPipeline::new(lang, device, vec![100])));
        let dropped = factory.dropped();
        let registry = PipelineRegistry::new(Box::new(factory));

        let in_flight = registry.ensure("a", Device::Cpu).unwrap();
        registry.ensure("b", Device::Cpu).unwrap();

        assert_eq!(in_flight.language_code(), "a");
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        drop(in_flight);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_construction_leaves_registry_empty() {
        let factory = StubFactory::new(|lang, device| {
            if lang == "x" {
                Err(crate::error::PipelineError::UnsupportedLanguage(lang.to_string()))
            } else {
                Ok(StubPipeline::new(lang, device, vec![100]))
            }
        });
        let dropped = factory.dropped();
        let registry = PipelineRegistry::new(Box::new(factory));

        drop(registry.ensure("a", Device::Cpu).unwrap());
        let err = registry.ensure("x", Device::Cpu).unwrap_err();

        match err {
            TtsError::PipelineInitialization { language_code, .. } => assert_eq!(language_code, "x"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(registry.active_language(), None);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        // Not retried automatically, but the next request rebuilds
        assert_eq!(registry.ensure("a", Device::Cpu).unwrap().language_code(), "a");
    }

    #[test]
    fn test_device_change_replaces_pipeline() {
        let factory = StubFactory::new(|lang, device| Ok(StubPipeline::new(lang, device, vec![100])));
        let constructed = factory.constructed();
        let registry = PipelineRegistry::new(Box::new(factory));

        registry.ensure("a", Device::Cpu).unwrap();
        let handle = registry.ensure("a", Device::Cuda).unwrap();

        assert_eq!(handle.device(), Device::Cuda);
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_ensure_constructs_once() {
        let factory = StubFactory::new(|lang, device| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(StubPipeline::new(lang, device, vec![100]))
        });
        let constructed = factory.constructed();
        let registry = PipelineRegistry::new(Box::new(factory));
        let ids = Mutex::new(Vec::new());
        let calls = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let handle = registry.ensure("a", Device::Cpu).unwrap();
                    ids.lock().push(handle.id());
                    calls.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(ids.lock().iter().all(|id| *id == 1));
    }

    #[test]
    fn test_concurrent_mixed_languages_never_leak() {
        let factory = StubFactory::new(|lang, device| {
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(StubPipeline::new(lang, device, vec![100]))
        });
        let constructed = factory.constructed();
        let dropped = factory.dropped();
        let registry = PipelineRegistry::new(Box::new(factory));

        std::thread::scope(|scope| {
            for i in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    let language = if i % 2 == 0 { "a" } else { "b" };
                    for _ in 0..4 {
                        let handle = registry.ensure(language, Device::Cpu).unwrap();
                        assert_eq!(handle.language_code(), language);
                    }
                });
            }
        });

        // Every replaced pipeline was released; only the active one remains
        let live = constructed.load(Ordering::SeqCst) - dropped.load(Ordering::SeqCst);
        assert_eq!(live, 1);
        assert!(registry.active_language().is_some());
    }

    #[test]
    fn test_release_drops_active_pipeline() {
        let factory = StubFactory::new(|lang, device| Ok(StubPipeline::new(lang, device, vec![100])));
        let dropped = factory.dropped();
        let registry = PipelineRegistry::new(Box::new(factory));

        drop(registry.ensure("a", Device::Cpu).unwrap());
        registry.release();

        assert_eq!(registry.active_language(), None);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }
}
