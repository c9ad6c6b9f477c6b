//! # Pipeline Plumbing Module
//!
//! Il minimo indispensabile di pipeline host per far scorrere i carrier
//! attraverso uno stage.
//!
//! ## Garanzie:
//! - Un solo evento terminale per ogni carrier in ingresso (`Data` o `Error`)
//! - Ordine FIFO, un carrier alla volta
//! - Un errore su un file non interrompe i file successivi

use crate::{carrier::FileCarrier, error::StageError};
use futures::stream::{Stream, StreamExt};

/// A per-file transform pluggable into a pipeline
#[allow(async_fn_in_trait)]
pub trait Transform {
    async fn transform(&self, carrier: FileCarrier) -> Result<FileCarrier, StageError>;
}

/// Terminal outcome for one input carrier
#[derive(Debug)]
pub enum PipelineEvent {
    Data(FileCarrier),
    Error { name: String, error: StageError },
}

/// Drive every carrier of `source` through `stage`, in order
pub fn pipe<'a, T, S>(stage: &'a T, source: S) -> impl Stream<Item = PipelineEvent> + 'a
where
    T: Transform + 'a,
    S: Stream<Item = FileCarrier> + 'a,
{
    source.then(move |carrier| async move {
        let name = carrier.name();
        match stage.transform(carrier).await {
            Ok(carrier) => PipelineEvent::Data(carrier),
            Err(error) => PipelineEvent::Error { name, error },
        }
    })
}

/// Everything a run of [`pipe`] produced
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub emitted: Vec<FileCarrier>,
    pub errors: Vec<(String, StageError)>,
}

/// Run a batch of carriers through `stage` and collect the results
pub async fn run_all<T: Transform>(stage: &T, carriers: Vec<FileCarrier>) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();
    let events = pipe(stage, futures::stream::iter(carriers));
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            PipelineEvent::Data(carrier) => outcome.emitted.push(carrier),
            PipelineEvent::Error { name, error } => outcome.errors.push((name, error)),
        }
    }

    outcome
}
