//! Scriptlens explains browser-automation workflow scripts.
//!
//! A script's `workflow()` function is parsed once and presented as:
//!
//! - **Steps**: one [`SemanticNode`] per statement, nested like the source
//! - **Actions**: contiguous statements grouped into [`WorkflowAction`]s with
//!   plain-language explanations
//! - **Raw**: the source with type syntax removed
//!
//! ```no_run
//! use scriptlens_core::{analyze, AnalyzeOptions, Catalog};
//!
//! let source = "async function workflow() { await page.goto('https://example.com'); }";
//! let analysis = analyze(source, &AnalyzeOptions::default(), &Catalog::english()).unwrap();
//! println!("{}", analysis.actions[0].title);
//! ```

pub mod actions;
pub mod analyzer;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod i18n;
pub mod parser;
pub mod steps;

pub use actions::{group_actions, ActionType, ExplainOptions, Importance, WorkflowAction};
pub use analyzer::{analyze, Analysis, AnalyzeOptions, Analyzer, Failure};
pub use config::{Config, ConfigError};
pub use diagnostics::{check_workflow, Diagnostic, Severity};
pub use i18n::{Catalog, CatalogError, Localizer, Message};
pub use parser::strip::strip_types;
pub use parser::{parse_workflow, ParseError, WorkflowDef};
pub use steps::{render_steps, Color, NodeKind, RenderOptions, SemanticNode};
