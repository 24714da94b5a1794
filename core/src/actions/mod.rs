//! Actions view: statements grouped into user-level actions.
//!
//! A single left-to-right pass partitions the top-level statements into
//! contiguous groups. Per starting statement the first rule that applies
//! wins:
//!
//! 1. `return` becomes its own action.
//! 2. Control flow (`if`, loops, `try`, `switch`) becomes its own action.
//! 3. A declaration absorbs the expression statements right after it that
//!    mention the declared name, when the combined code hits a keyword set.
//! 4. A statement that hits a keyword set stands alone.
//! 5. Anything else is a computation.

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::codegen::render_compact;
use crate::codegen::text::join_texts;
use crate::i18n::{Localizer, Message};
use crate::parser::ast::{Pattern, Stmt};
use crate::steps::Color;

pub mod explain;
pub mod keywords;

pub use explain::{ExplainError, ExplainOptions, Explainer};

use keywords::{classify, first_string_literal};


/* ===================== Types ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Navigation,
    Interaction,
    DataExtraction,
    ControlFlow,
    Return,
    Computation,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Navigation => "navigation",
            ActionType::Interaction => "interaction",
            ActionType::DataExtraction => "data-extraction",
            ActionType::ControlFlow => "control-flow",
            ActionType::Return => "return",
            ActionType::Computation => "computation",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ActionType::Navigation => "navigation",
            ActionType::Interaction => "interaction",
            ActionType::DataExtraction => "extraction",
            ActionType::ControlFlow => "branch",
            ActionType::Return => "return",
            ActionType::Computation => "compute",
        }
    }

    /// Catalog keys for (title, description, fallback sentence)
    fn keys(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ActionType::Navigation => (
                "actions.navigation",
                "actions.navigation_description",
                "actions.navigation_readable",
            ),
            ActionType::Interaction => (
                "actions.interaction",
                "actions.interaction_description",
                "actions.interaction_readable",
            ),
            ActionType::DataExtraction => (
                "actions.data_extraction",
                "actions.data_extraction_description",
                "actions.data_extraction_readable",
            ),
            ActionType::ControlFlow => (
                "actions.control_flow",
                "actions.control_flow_description",
                "actions.control_flow_readable",
            ),
            ActionType::Return => (
                "actions.return",
                "actions.return_description",
                "actions.return_readable",
            ),
            ActionType::Computation => (
                "actions.computation",
                "actions.computation_description",
                "actions.computation_readable",
            ),
        }
    }

    /// Importance of a keyword action that is not part of a group
    fn standalone_importance(&self) -> Importance {
        match self {
            ActionType::DataExtraction => Importance::Medium,
            ActionType::Computation => Importance::Low,
            _ => Importance::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }
}

pub fn action_color(action_type: ActionType, importance: Importance) -> Color {
    if importance == Importance::Low {
        return Color::Gray;
    }
    match action_type {
        ActionType::Navigation => Color::Blue,
        ActionType::Interaction => Color::Purple,
        ActionType::DataExtraction => Color::Green,
        ActionType::ControlFlow => Color::Orange,
        ActionType::Return => Color::Pink,
        ActionType::Computation => Color::Cyan,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub title: String,
    pub description: String,
    pub human_readable_text: String,
    /// Indices into the top-level statement list, ascending and contiguous
    pub statements: Vec<usize>,
    pub importance: Importance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    pub details: Vec<String>,
    pub icon: &'static str,
    pub color: Color,
}

/* ===================== Grouping ===================== */

pub fn group_actions(
    statements: &[Stmt],
    options: &ExplainOptions,
    localizer: &dyn Localizer,
) -> Vec<WorkflowAction> {
    let grouper = Grouper {
        statements,
        codes: statements.iter().map(|stmt| render_compact(stmt)).collect(),
        explainer: Explainer::new(options, localizer),
        localizer,
    };

    let mut actions = Vec::new();
    let mut idx = 0;
    while idx < statements.len() {
        let (action, next) = grouper.action_at(idx);
        actions.push(action);
        idx = next;
    }
    debug!(statements = statements.len(), actions = actions.len(), "grouped actions");
    actions
}

struct Grouper<'a> {
    statements: &'a [Stmt],
    /// Compact code per statement
    codes: Vec<String>,
    explainer: Explainer<'a>,
    localizer: &'a dyn Localizer,
}

impl Grouper<'_> {
    fn t(&self, message: Message) -> String {
        message.localize(self.localizer)
    }

    /// The action starting at `idx` and the index after it
    fn action_at(&self, idx: usize) -> (WorkflowAction, usize) {
        let stmt = &self.statements[idx];

        if matches!(stmt, Stmt::Return { .. }) {
            return (self.return_action(idx), idx + 1);
        }
        if stmt.is_control_flow() {
            return (self.control_flow_action(idx), idx + 1);
        }

        let name = declared_name(stmt);
        if let Some(name) = name {
            let end = self.group_end(idx, name);
            if end > idx + 1 {
                let combined = self.codes[idx..end].join(" ");
                if let Some(action_type) = classify(&combined) {
                    let action = self.keyword_action(
                        action_type,
                        idx..end,
                        Importance::High,
                        Some(name),
                    );
                    return (action, end);
                }
            }
        }

        if let Some(action_type) = classify(&self.codes[idx]) {
            let importance = action_type.standalone_importance();
            return (
                self.keyword_action(action_type, idx..idx + 1, importance, None),
                idx + 1,
            );
        }

        (self.computation_action(idx, name), idx + 1)
    }

    /// End of the run of expression statements after `idx` that mention
    /// `name`
    fn group_end(&self, idx: usize, name: &str) -> usize {
        let mut end = idx + 1;
        while end < self.statements.len()
            && matches!(self.statements[end], Stmt::Expr { .. })
            && self.codes[end].contains(name)
        {
            end += 1;
        }
        end
    }

    fn details(&self, range: Range<usize>) -> Vec<String> {
        self.statements[range]
            .iter()
            .flat_map(|stmt| self.explainer.details(stmt))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        action_type: ActionType,
        range: Range<usize>,
        importance: Importance,
        title: String,
        description: String,
        details: Vec<String>,
        variables: Option<Vec<String>>,
    ) -> WorkflowAction {
        let (_, _, readable_key) = action_type.keys();
        let human_readable_text = if details.is_empty() {
            self.t(Message::new(readable_key))
        } else {
            join_texts(&details, " → ")
        };
        WorkflowAction {
            action_type,
            title,
            description,
            human_readable_text,
            statements: range.collect(),
            importance,
            variables,
            details,
            icon: action_type.icon(),
            color: action_color(action_type, importance),
        }
    }

    fn return_action(&self, idx: usize) -> WorkflowAction {
        let (title, description, _) = ActionType::Return.keys();
        self.build(
            ActionType::Return,
            idx..idx + 1,
            Importance::High,
            self.t(Message::new(title)),
            self.t(Message::new(description)),
            self.details(idx..idx + 1),
            None,
        )
    }

    fn control_flow_action(&self, idx: usize) -> WorkflowAction {
        let stmt = &self.statements[idx];
        let (title, description) = match stmt {
            Stmt::If { test, .. } => {
                let condition = self
                    .explainer
                    .condition(test.as_ref())
                    .unwrap_or_default();
                (
                    Message::new("actions.if_statement"),
                    Message::new("actions.if_description").arg("condition", condition),
                )
            }
            Stmt::For { .. } => (
                Message::new("actions.for_loop"),
                Message::new("actions.for_description"),
            ),
            Stmt::While { test, .. } | Stmt::DoWhile { test, .. } => {
                let condition = self
                    .explainer
                    .condition(test.as_ref())
                    .unwrap_or_default();
                (
                    Message::new("actions.while_loop"),
                    Message::new("actions.while_description").arg("condition", condition),
                )
            }
            Stmt::ForEach { .. } => (
                Message::new("actions.for_of_loop"),
                Message::new("actions.for_of_description"),
            ),
            _ => {
                let (title, description, _) = ActionType::ControlFlow.keys();
                (Message::new(title), Message::new(description))
            }
        };

        let mut details = self.details(idx..idx + 1);
        if details.is_empty() {
            details = vec![
                self.t(Message::new("actions.check_condition")),
                self.t(Message::new("actions.execute_action")),
            ];
        }
        self.build(
            ActionType::ControlFlow,
            idx..idx + 1,
            Importance::High,
            self.t(title),
            self.t(description),
            details,
            None,
        )
    }

    fn keyword_action(
        &self,
        action_type: ActionType,
        range: Range<usize>,
        importance: Importance,
        variable: Option<&str>,
    ) -> WorkflowAction {
        let (title, description, _) = action_type.keys();
        let description = match action_type {
            ActionType::Navigation => {
                let code = self.codes[range.clone()].join(" ");
                match first_string_literal(&code) {
                    Some(url) => Message::new("actions.navigation_with_url").arg("url", url),
                    None => Message::new(description),
                }
            }
            _ => Message::new(description),
        };
        self.build(
            action_type,
            range.clone(),
            importance,
            self.t(Message::new(title)),
            self.t(description),
            self.details(range),
            variable.map(|name| vec![name.to_string()]),
        )
    }

    fn computation_action(&self, idx: usize, name: Option<&str>) -> WorkflowAction {
        let (title, description) = match name {
            Some(name) => (
                Message::new("actions.prepare_variable").arg("name", name),
                Message::new("actions.prepare_description").arg("name", name),
            ),
            None => {
                let (title, description, _) = ActionType::Computation.keys();
                (Message::new(title), Message::new(description))
            }
        };
        self.build(
            ActionType::Computation,
            idx..idx + 1,
            Importance::Low,
            self.t(title),
            self.t(description),
            self.details(idx..idx + 1),
            name.map(|name| vec![name.to_string()]),
        )
    }
}

/// Name bound by a declaration whose first target is a plain identifier
fn declared_name(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::VarDecl { declarations, .. } => match &declarations.first()?.target {
            Pattern::Ident { name, .. } => Some(name.as_str()),
            _ => None,
        },
        _ => None,
    }
}
