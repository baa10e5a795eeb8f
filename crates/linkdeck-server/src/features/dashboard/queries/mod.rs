pub mod dashboard_data;
pub mod section_links;
pub mod sections;
pub mod stats;
pub mod status_options;

pub use dashboard_data::{DashboardDataError, SpreadsheetView};
pub use section_links::{GetSectionLinksError, GetSectionLinksQuery, GetSectionLinksResponse};
pub use sections::{ListSectionsError, SectionSummary};
pub use status_options::StatusOptionsError;
