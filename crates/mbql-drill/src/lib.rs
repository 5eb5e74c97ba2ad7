//! Drill-through resolution
//!
//! Given a query, a click on its results and the query's metadata,
//! [`available`] lists the query transformations that make sense for the
//! click and [`apply`] performs the one the user picked.
//!
//! ```text
//! ClickContext ──> available() ──> [DrillDescriptor] ──> select() ──> apply() ──> Query
//! ```

mod context;
mod descriptor;
pub mod kinds;
pub mod trend;

use mbql_filter::FilterError;
use mbql_ir::{MetadataProvider, Query, QueryError};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub use context::{ClickContext, RowValue};
pub use descriptor::{DrillDescriptor, DrillOffer, DrillType};
pub use kinds::{DrillInput, DrillKind};

#[derive(Debug, Error, PartialEq)]
pub enum DrillError {
    #[error("Invalid drill descriptor: {0}")]
    InvalidDrillDescriptor(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Drills offered for `click` on the results of `stage`
pub fn available(
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    click: &ClickContext,
) -> Vec<DrillDescriptor> {
    if query.stage(stage).is_err() {
        return Vec::new();
    }
    let input = DrillInput {
        provider,
        query,
        stage,
        click,
    };
    let fingerprint = query.fingerprint();

    let descriptors: Vec<DrillDescriptor> = kinds::kinds()
        .iter()
        .filter_map(|kind| {
            let offer = kind.applies(&input);
            trace!(drill = %kind.drill_type(), applies = offer.is_some(), "Checked drill kind");
            offer.map(|offer| {
                DrillDescriptor::new(
                    kind.drill_type(),
                    offer,
                    fingerprint.clone(),
                    stage,
                    click.clone(),
                )
            })
        })
        .collect();

    debug!(
        column = %click.column.name,
        stage,
        drills = ?descriptors.iter().map(|d| d.drill_type().as_str()).collect::<Vec<_>>(),
        "Available drills"
    );
    descriptors
}

/// Query produced by `descriptor`
///
/// The descriptor must still be offered for its own click on `query`, and
/// its selected choice must be one of its choices.
pub fn apply(
    provider: &dyn MetadataProvider,
    query: &Query,
    stage: usize,
    descriptor: &DrillDescriptor,
) -> Result<Query, DrillError> {
    let reject = |reason: &str| {
        warn!(drill = %descriptor.drill_type(), reason, "Rejected drill descriptor");
        Err(DrillError::InvalidDrillDescriptor(format!(
            "{}: {}",
            descriptor.drill_type(),
            reason
        )))
    };

    let offered = available(provider, query, stage, descriptor.context())
        .into_iter()
        .any(|candidate| candidate.same_offer(descriptor));
    if !offered {
        return reject("not available for this query and click");
    }
    if !descriptor.choices().is_empty()
        && !descriptor
            .selected()
            .is_some_and(|choice| descriptor.choices().iter().any(|c| c == choice))
    {
        return reject("selected choice is not offered");
    }

    let Some(kind) = kinds::kind(descriptor.drill_type()) else {
        return reject("drill kind is not registered");
    };
    let input = DrillInput {
        provider,
        query,
        stage,
        click: descriptor.context(),
    };
    let result = kind.apply(&input, descriptor)?;
    debug!(
        drill = %descriptor.drill_type(),
        choice = descriptor.selected(),
        stages = result.stage_count(),
        "Applied drill"
    );
    Ok(result)
}
