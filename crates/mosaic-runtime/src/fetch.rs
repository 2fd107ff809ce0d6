//! Fetch cycles and the per-widget poll loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::events::{WidgetEvent, WidgetNotifier};
use crate::provider::{Provider, ProviderError, ProviderRequest};
use crate::widget::WidgetSlot;

/// How one fetch cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
  /// New records were stored. `total` counts them before any filter.
  Updated { total: usize },
  /// The provider failed; the previous records were kept.
  Failed(ProviderError),
  /// Another fetch for the same widget was already in flight.
  Skipped,
  /// The widget was removed while the fetch was running.
  Discarded,
}

/// Shared handles every fetch cycle needs.
#[derive(Clone)]
pub(crate) struct Collaborators {
  pub(crate) provider: Arc<dyn Provider>,
  pub(crate) notifier: Arc<dyn WidgetNotifier>,
}

/// Run one fetch cycle for a widget.
#[instrument(skip_all, fields(widget_id = %slot.id))]
pub(crate) async fn run_fetch(slot: Arc<WidgetSlot>, collaborators: Collaborators) -> FetchOutcome {
  let Some(_guard) = slot.begin_fetch() else {
    debug!("fetch already in flight, coalescing");
    return FetchOutcome::Skipped;
  };

  let request = ProviderRequest::new(&slot.definition.data_source, slot.instance().config);
  let result = tokio::select! {
    biased;
    _ = slot.cancel.cancelled() => None,
    result = collaborators.provider.fetch(&request) => Some(result),
  };

  let (Some(result), Some(_emit)) = (result, slot.emit()) else {
    debug!("widget removed during fetch, discarding result");
    return FetchOutcome::Discarded;
  };

  match result {
    Ok(response) => {
      let view = slot.ingest(&response);
      let total = view.total;
      debug!(total, visible = view.records.len(), "records updated");

      collaborators.notifier.notify(WidgetEvent::DataUpdated {
        widget_id: slot.id.clone(),
        records: view.records,
        total,
      });
      if let Some(indices) = view.highlighted {
        collaborators.notifier.notify(WidgetEvent::Highlighted {
          widget_id: slot.id.clone(),
          indices,
        });
      }
      FetchOutcome::Updated { total }
    }
    Err(error) => {
      warn!(
        code = %error.code,
        retryable = error.retryable,
        error = %error.message,
        "provider fetch failed"
      );
      collaborators.notifier.notify(WidgetEvent::FetchFailed {
        widget_id: slot.id.clone(),
        error: error.clone(),
      });
      FetchOutcome::Failed(error)
    }
  }
}

/// Fetch on every tick until the widget's token is cancelled.
///
/// The first tick fires immediately. Each tick spawns its own fetch cycle,
/// so a slow provider call overlapping the next tick is coalesced by the
/// in-flight flag rather than queued.
pub(crate) async fn poll(slot: Arc<WidgetSlot>, collaborators: Collaborators, period: Duration) {
  let mut ticker = tokio::time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  info!(widget_id = %slot.id, period_seconds = period.as_secs(), "starting poll loop");

  loop {
    tokio::select! {
      _ = slot.cancel.cancelled() => {
        info!(widget_id = %slot.id, "poll loop cancelled");
        break;
      }
      _ = ticker.tick() => {
        tokio::spawn(run_fetch(slot.clone(), collaborators.clone()));
      }
    }
  }
}
