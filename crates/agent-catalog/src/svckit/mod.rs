//! Service Kit - Agent Tools
//!
//! Tools implementing `agent_core::Tool` for the catalog scenarios.

mod arithmetic;
mod company_lookup;

pub use arithmetic::{AddTool, CalculateTipTool, DEFAULT_TIP_PERCENTAGE, TipBreakdown, format_number};
pub use company_lookup::{CompanyLookupTool, CompanyProfile, find_company};
