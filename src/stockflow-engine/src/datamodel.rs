// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::model_err;

pub type ProjectId = u32;
pub type StockId = u32;
pub type VariableId = u32;
pub type FlowId = u32;

fn default_initial_value() -> String {
    "0".to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub name: String,
    #[serde(default = "default_initial_value")]
    pub initial_value: String,
    pub project_id: ProjectId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    #[serde(alias = "value")]
    pub equation: String,
    pub project_id: ProjectId,
}

/// A flow moves the value of its rate equation out of `from_stock` and
/// into `to_stock` every step.  `name` is only a label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    #[serde(default)]
    pub name: String,
    pub equation: String,
    #[serde(default)]
    pub from_stock: Option<StockId>,
    #[serde(default)]
    pub to_stock: Option<StockId>,
}

/// The order stocks and variables are initialized in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitOrder {
    /// Declaration order: a reference to a stock or variable declared
    /// later reads zero during initialization.
    #[default]
    Declared,
    /// Dependencies are initialized before the elements that reference
    /// them.
    Dependency,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSpecs {
    pub steps: usize,
    #[serde(default)]
    pub init_order: InitOrder,
}

impl SimSpecs {
    pub fn new(steps: usize) -> Self {
        SimSpecs {
            steps,
            init_order: InitOrder::Declared,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRequest {
    pub project_id: ProjectId,
    #[serde(rename = "sim_step")]
    pub steps: usize,
}

impl SimRequest {
    /// Reject requests the engine should never be handed: zero steps, or
    /// more steps than the caller is willing to wait for.
    pub fn validate(&self, max_steps: usize) -> Result<()> {
        if self.steps == 0 {
            return model_err!(BadSimSpecs, "sim_step must be at least 1".to_owned());
        }
        if self.steps > max_steps {
            return model_err!(
                BadSimSpecs,
                format!("sim_step {} exceeds the limit of {max_steps}", self.steps)
            );
        }
        Ok(())
    }
}

/// Everything one simulation needs: a single project's elements, already
/// filtered and in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Model {
    pub stocks: Vec<Stock>,
    pub variables: Vec<Variable>,
    pub flows: Vec<Flow>,
}

/// A collection of projects and their elements, as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub stocks: Vec<Stock>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_specs: Option<SimSpecs>,
}

impl File {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|err| {
            Error::new(
                ErrorKind::Import,
                ErrorCode::JsonDeserialization,
                Some(err.to_string()),
            )
        })
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn stocks_for(&self, project_id: ProjectId) -> Vec<Stock> {
        self.stocks
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn variables_for(&self, project_id: ProjectId) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|v| v.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Flows with an origin or a destination among `stocks`.  Flows carry
    /// no project of their own; this is how they are scoped.
    pub fn flows_touching(&self, stocks: &[Stock]) -> Vec<Flow> {
        let ids: HashSet<StockId> = stocks.iter().map(|s| s.id).collect();
        let touches = |id: Option<StockId>| id.is_some_and(|id| ids.contains(&id));
        self.flows
            .iter()
            .filter(|f| touches(f.from_stock) || touches(f.to_stock))
            .cloned()
            .collect()
    }

    pub fn model(&self, project_id: ProjectId) -> Result<Model> {
        if self.project(project_id).is_none() {
            return model_err!(DoesNotExist, format!("project {project_id}"));
        }
        let stocks = self.stocks_for(project_id);
        let variables = self.variables_for(project_id);
        let flows = self.flows_touching(&stocks);
        Ok(Model {
            stocks,
            variables,
            flows,
        })
    }
}
