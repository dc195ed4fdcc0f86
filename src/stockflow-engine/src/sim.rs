// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Discrete-time stepping of a stock and flow model.
//!
//! A run starts by computing initial values: every stock's initial value
//! equation against the stocks computed so far, then every variable's
//! equation against the stocks and the variables computed so far.  Each
//! step then recomputes all variables from the previous step's values,
//! applies every flow in turn to its endpoint stocks, and records a
//! snapshot.  Any equation failure aborts the run.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info_span, trace, warn};

use crate::common::{EquationError, Error, ErrorKind, Result};
use crate::datamodel::{Flow, InitOrder, SimSpecs, Stock, StockId, Variable};
use crate::deps::topo_sort;
use crate::eval::{Equation, ValueTable, references, substitute};
use crate::results::{Results, Snapshot};
use crate::sim_err;

/// The run-time half of a variable or flow: its name and parsed equation.
struct Compiled<'a> {
    name: &'a str,
    equation: Equation,
}

struct CompiledFlow<'a> {
    label: String,
    equation: Equation,
    from: Option<&'a str>,
    to: Option<&'a str>,
}

/// `expanded` is the equation after substitution, which is the text the
/// error's position refers to.
fn element_error(kind: &str, name: &str, expanded: &str, err: &EquationError) -> Error {
    Error::from_equation(
        ErrorKind::Simulation,
        &format!("{kind} '{name}'"),
        expanded,
        err,
    )
}

fn eval_traced(
    kind: &str,
    name: &str,
    equation: &Equation,
    stocks: &ValueTable,
    variables: &ValueTable,
) -> Result<i64> {
    let value = equation.eval(stocks, variables).map_err(|err| {
        let expanded = substitute(equation.text(), stocks, variables);
        element_error(kind, name, &expanded, &err)
    })?;
    trace!(
        kind,
        element = name,
        expanded = %substitute(equation.text(), stocks, variables),
        value,
        "evaluated"
    );
    Ok(value)
}

/// The working tables of one run.  Owned by the run and dropped with it;
/// nothing here outlives a call to [`Simulation::run`].
struct State<'a> {
    stock_values: ValueTable,
    variable_values: ValueTable,
    variables: Vec<Compiled<'a>>,
}

impl<'a> State<'a> {
    fn initialize(stocks: &[&'a Stock], variables: &[&'a Variable]) -> Result<Self> {
        let mut stock_values = ValueTable::with_capacity(stocks.len());
        // stocks only see other stocks while initializing
        let no_variables = ValueTable::new();
        for stock in stocks {
            let equation = Equation::new(&stock.initial_value);
            let value = eval_traced(
                "stock",
                &stock.name,
                &equation,
                &stock_values,
                &no_variables,
            )?;
            stock_values.insert(stock.name.clone(), value);
        }

        let mut variable_values = ValueTable::with_capacity(variables.len());
        let mut compiled = Vec::with_capacity(variables.len());
        for var in variables {
            let equation = Equation::new(&var.equation);
            let value = eval_traced(
                "variable",
                &var.name,
                &equation,
                &stock_values,
                &variable_values,
            )?;
            variable_values.insert(var.name.clone(), value);
            compiled.push(Compiled {
                name: &var.name,
                equation,
            });
        }

        Ok(State {
            stock_values,
            variable_values,
            variables: compiled,
        })
    }

    fn step(&mut self, flows: &[CompiledFlow]) -> Result<Snapshot> {
        // every variable sees last step's variables, never this step's
        let mut step_values = ValueTable::with_capacity(self.variables.len());
        for var in self.variables.iter() {
            let value = eval_traced(
                "variable",
                var.name,
                &var.equation,
                &self.stock_values,
                &self.variable_values,
            )?;
            step_values.insert(var.name.to_owned(), value);
        }

        // flows are applied in order; later flows see the stock values
        // left by earlier ones
        for flow in flows.iter() {
            let amount = eval_traced(
                "flow",
                &flow.label,
                &flow.equation,
                &self.stock_values,
                &step_values,
            )?;
            if let Some(from) = flow.from {
                self.adjust(from, amount, i64::checked_sub)?;
            }
            if let Some(to) = flow.to {
                self.adjust(to, amount, i64::checked_add)?;
            }
        }

        let mut snapshot: Snapshot = self
            .stock_values
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        // a variable sharing a stock's name wins
        snapshot.extend(step_values.iter().map(|(name, value)| (name.clone(), *value)));

        self.variable_values = step_values;
        Ok(snapshot)
    }

    fn adjust(
        &mut self,
        stock: &str,
        amount: i64,
        op: fn(i64, i64) -> Option<i64>,
    ) -> Result<()> {
        let current = self.stock_values.entry(stock.to_owned()).or_insert(0);
        match op(*current, amount) {
            Some(value) => {
                *current = value;
                Ok(())
            }
            None => sim_err!(
                IntegerOverflow,
                format!("stock '{stock}' overflowed applying {amount}")
            ),
        }
    }
}

/// A simulation over borrowed model elements.  The elements are never
/// modified, so one set of inputs can back any number of concurrent runs.
pub struct Simulation<'a> {
    stocks: &'a [Stock],
    variables: &'a [Variable],
    flows: &'a [Flow],
}

impl<'a> Simulation<'a> {
    pub fn new(stocks: &'a [Stock], variables: &'a [Variable], flows: &'a [Flow]) -> Self {
        Simulation {
            stocks,
            variables,
            flows,
        }
    }

    /// Stocks in declaration order, then variables; the column order of
    /// tabular output.
    fn columns(&self) -> Vec<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        self.stocks
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.variables.iter().map(|v| v.name.as_str()))
            .filter(|name| seen.insert(*name))
            .map(str::to_owned)
            .collect()
    }

    pub fn run(&self, specs: &SimSpecs) -> Result<Results> {
        let mut results = Results::new(self.columns());
        if specs.steps == 0 {
            return Ok(results);
        }

        let span = info_span!(
            "simulate",
            stocks = self.stocks.len(),
            variables = self.variables.len(),
            flows = self.flows.len(),
            steps = specs.steps,
        );
        let _enter = span.enter();

        let (stocks, variables) = self.init_order(specs.init_order)?;
        let mut state = State::initialize(&stocks, &variables)?;
        let flows = self.compile_flows();

        results.snapshots.reserve(specs.steps);
        for step in 0..specs.steps {
            let snapshot = state.step(&flows)?;
            debug!(step = step + 1, ?snapshot, "step complete");
            results.snapshots.push(snapshot);
        }

        Ok(results)
    }

    fn init_order(&self, order: InitOrder) -> Result<(Vec<&'a Stock>, Vec<&'a Variable>)> {
        let stocks: Vec<&'a Stock> = self.stocks.iter().collect();
        let variables: Vec<&'a Variable> = self.variables.iter().collect();
        match order {
            InitOrder::Declared => Ok((stocks, variables)),
            InitOrder::Dependency => {
                let stocks = sort_by_references(
                    stocks,
                    |s| s.name.as_str(),
                    |s| s.initial_value.as_str(),
                )?;
                let variables =
                    sort_by_references(variables, |v| v.name.as_str(), |v| v.equation.as_str())?;
                Ok((stocks, variables))
            }
        }
    }

    /// Resolve every flow's endpoints.  Rate equations are not checked
    /// here: like every other equation, a broken one fails when it is
    /// first evaluated.
    fn compile_flows(&self) -> Vec<CompiledFlow<'a>> {
        let names: HashMap<StockId, &'a str> = self
            .stocks
            .iter()
            .map(|s| (s.id, s.name.as_str()))
            .collect();
        let resolve = |flow: &Flow, endpoint: Option<StockId>| -> Option<&'a str> {
            let id = endpoint?;
            let name = names.get(&id).copied();
            if name.is_none() {
                warn!(
                    flow = flow.id,
                    stock = id,
                    "flow endpoint is not a stock in this model, ignoring"
                );
            }
            name
        };

        self.flows
            .iter()
            .map(|flow| CompiledFlow {
                label: if flow.name.is_empty() {
                    format!("#{}", flow.id)
                } else {
                    flow.name.clone()
                },
                equation: Equation::new(&flow.equation),
                from: resolve(flow, flow.from_stock),
                to: resolve(flow, flow.to_stock),
            })
            .collect()
    }
}

/// Put `elements` in dependency order, where an element depends on the
/// other elements its equation references by name.  A reference to itself
/// reads zero during initialization and is not a dependency.
fn sort_by_references<'a, T>(
    elements: Vec<&'a T>,
    name: impl Fn(&'a T) -> &'a str,
    equation: impl Fn(&'a T) -> &'a str,
) -> Result<Vec<&'a T>> {
    let names: Vec<&'a str> = elements.iter().map(|&el| name(el)).collect();
    let dependencies: HashMap<&'a str, BTreeSet<&'a str>> = names
        .iter()
        .zip(elements.iter())
        .map(|(&name, &el)| {
            let mut refs = references(equation(el));
            refs.remove(name);
            (name, refs)
        })
        .collect();

    // names should be unique, but a duplicate must not drop an element
    let mut by_name: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for (&name, &el) in names.iter().zip(elements.iter()) {
        by_name.entry(name).or_default().push(el);
    }
    let mut runlist: Vec<&str> = names.clone();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    runlist.retain(|name| seen.insert(*name));

    let sorted = topo_sort(&runlist, &dependencies)?;
    Ok(sorted
        .into_iter()
        .flat_map(|name| by_name[name].iter().copied())
        .collect())
}

/// Run `steps` steps over the given elements in declaration order.
pub fn simulate(
    stocks: &[Stock],
    variables: &[Variable],
    flows: &[Flow],
    steps: usize,
) -> Result<Results> {
    Simulation::new(stocks, variables, flows).run(&SimSpecs::new(steps))
}
