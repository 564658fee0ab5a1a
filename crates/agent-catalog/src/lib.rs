//! # agent-catalog
//!
//! A handful of example structured agents built on `agent-core`, the tools
//! they call and the harness that runs their demos.
//!
//! | Scenario           | Tools                    | Contract highlights              |
//! |--------------------|--------------------------|----------------------------------|
//! | `lead_qualifier`   | `company_lookup`         | nested record, score 0-100       |
//! | `ticket_router`    | -                        | four nested records, 1-10 scores |
//! | `financial_report` | -                        | report builder, ranked findings  |
//! | `lesson_planner`   | -                        | list of records                  |
//! | `expense_splitter` | `add`, `calculate_tip`   | money fields, tool round         |
//! | `self_improving`   | -                        | optional record fed to a store   |

pub mod harness;
pub mod scenarios;
pub mod svckit;

pub use harness::{RAW_RESPONSE_BANNER, run_demo};
pub use scenarios::{Scenario, agent_builder, build_agent, catalog, find};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{AddTool, CalculateTipTool, CompanyLookupTool};
}
