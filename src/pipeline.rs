//! Generic three-stage ETL coordination.
//!
//! A pipeline is three capabilities wired together:
//!
//! - [`Extract`]: pull a batch from an external source
//! - [`Transform`]: validate and enrich the batch
//! - [`Load`]: persist the batch, reporting success as a boolean
//!
//! [`Pipeline`] sequences them, logging per-stage record counts and the total
//! duration. Any compatible implementation may be substituted at each seam;
//! the news and market pipelines share this runner with different capability
//! implementations.
//!
//! # Failure semantics
//!
//! Extract and transform failures are logged with their stage context and
//! re-raised to the caller. The load stage never raises: it reports `false`,
//! and the caller decides whether that is fatal. There is no partial commit
//! across stages; the store owns its own transactional boundary.

use std::fmt;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::errors::EtlError;
use crate::models::RecordCount;

/// Extract capability: produce a batch from an external source.
pub trait Extract {
    type Batch: RecordCount;

    async fn do_extract(&mut self) -> Result<Self::Batch, EtlError>;
}

/// Transform capability: turn an extracted batch into a loadable one.
pub trait Transform {
    type Input;
    type Output: RecordCount;

    fn do_transform(&self, input: Self::Input) -> Result<Self::Output, EtlError>;
}

/// Load capability: persist a transformed batch.
///
/// Returns `true` on success (including the nothing-to-do case) and `false`
/// on persistence failure, after logging. Implementations must not panic or
/// raise on ordinary persistence errors.
pub trait Load {
    type Input;

    async fn do_load(&self, input: Self::Input) -> bool;
}

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Extracting => "extracting",
            Stage::Transforming => "transforming",
            Stage::Loading => "loading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Three-stage coordinator, generic over its capability implementations.
pub struct Pipeline<E, T, L> {
    name: &'static str,
    stage: Stage,
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extract,
    T: Transform<Input = E::Batch>,
    L: Load<Input = T::Output>,
{
    pub fn new(name: &'static str, extractor: E, transformer: T, loader: L) -> Self {
        Self {
            name,
            stage: Stage::Idle,
            extractor,
            transformer,
            loader,
        }
    }

    /// Current lifecycle stage; `Failed` is terminal.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run extract, transform, and load in order.
    ///
    /// Returns the load stage's boolean on completion, or the first stage
    /// error encountered. A `false` load result does not fail the run.
    pub async fn run(&mut self) -> Result<bool, EtlError> {
        let started = Instant::now();
        info!(pipeline = self.name, "starting pipeline run");

        self.stage = Stage::Extracting;
        let extracted = match self.extractor.do_extract().await {
            Ok(batch) => batch,
            Err(err) => return Err(self.fail(err)),
        };
        info!(
            pipeline = self.name,
            records = extracted.record_count(),
            "extract stage complete"
        );

        self.stage = Stage::Transforming;
        let transformed = match self.transformer.do_transform(extracted) {
            Ok(batch) => batch,
            Err(err) => return Err(self.fail(err)),
        };
        info!(
            pipeline = self.name,
            records = transformed.record_count(),
            "transform stage complete"
        );

        self.stage = Stage::Loading;
        let loaded = self.loader.do_load(transformed).await;
        if loaded {
            info!(pipeline = self.name, "load stage complete");
        } else {
            warn!(pipeline = self.name, "load stage reported failure");
        }

        self.stage = Stage::Done;
        let elapsed = started.elapsed();
        info!(
            pipeline = self.name,
            elapsed_ms = elapsed.as_millis() as u64,
            "pipeline run finished"
        );

        Ok(loaded)
    }

    fn fail(&mut self, err: EtlError) -> EtlError {
        error!(
            pipeline = self.name,
            stage = %self.stage,
            error = %err,
            "pipeline stage failed"
        );
        self.stage = Stage::Failed;
        err
    }
}
