mod helpers;
mod ingest;
mod reports;
mod status;
mod trends;

use anyhow::Result;

use loseit_core::reports::DateSelection;
use loseit_core::service::HealthService;

pub(crate) use helpers::json_error;
pub(crate) use ingest::{cmd_combine, cmd_load, cmd_sync, cmd_transform};
pub(crate) use reports::{
    cmd_activity, cmd_calories, cmd_food, cmd_macros, cmd_summary, cmd_weight,
};
pub(crate) use status::cmd_status;
pub(crate) use trends::cmd_trends;

/// Raw date arguments as typed on the command line.
pub(crate) struct DateArgs {
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateArgs {
    pub(super) fn selection(&self, service: &HealthService) -> Result<DateSelection> {
        Ok(service.selection(
            self.date.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
        )?)
    }

    pub(super) fn optional_selection(
        &self,
        service: &HealthService,
    ) -> Result<Option<DateSelection>> {
        Ok(service.optional_selection(
            self.date.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
        )?)
    }
}
