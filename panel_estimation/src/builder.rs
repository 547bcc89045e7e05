pub use crate::config::*;

use crate::assemble_panel;

/// Collects normalized quarter tables one at a time and assembles the panel
/// once all five are in.
///
/// Quarter files usually arrive one by one from disk, so this is the
/// incremental front door over [assemble_panel].
///
/// ```
/// pub use panel_estimation::builder::PanelBuilder;
/// # use panel_estimation::{normalize_quarter, EstimationError, Table};
/// # fn quarter(q: u8) -> Table {
/// #     let raw = Table::new(
/// #         vec![
/// #             "NEWID".to_string(),
/// #             "QINTRVMO".to_string(),
/// #             "QINTRVYR".to_string(),
/// #             "FINLWT21".to_string(),
/// #         ],
/// #         vec![],
/// #     );
/// #     normalize_quarter(&raw, 2016, q).unwrap()
/// # }
/// let mut builder = PanelBuilder::new();
/// for q in 1..=5 {
///     builder.add_quarter(quarter(q));
/// }
/// let panel = builder.build()?;
///
/// # Ok::<(), EstimationError>(())
/// ```
pub struct PanelBuilder {
    pub(crate) _quarters: Vec<Table>,
}

impl PanelBuilder {
    pub fn new() -> PanelBuilder {
        PanelBuilder {
            _quarters: Vec::new(),
        }
    }

    /// Adds the next normalized quarter table, in nominal quarter order.
    pub fn add_quarter(&mut self, table: Table) {
        self._quarters.push(table);
    }

    /// Assembles the panel. Fails unless exactly five quarters of the same
    /// nominal year were added.
    pub fn build(&self) -> Result<Panel, EstimationError> {
        assemble_panel(&self._quarters)
    }
}

impl Default for PanelBuilder {
    fn default() -> PanelBuilder {
        PanelBuilder::new()
    }
}
