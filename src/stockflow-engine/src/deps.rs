// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::common::Result;
use crate::model_err;

/// Order `runlist` so that every name comes after the names it depends on.
/// Ties keep their position in `runlist`.  Dependencies outside `runlist`
/// are ignored: they are either computed in an earlier phase or resolve to
/// zero.
pub fn topo_sort<'out>(
    runlist: &[&'out str],
    dependencies: &HashMap<&'out str, BTreeSet<&'out str>>,
) -> Result<Vec<&'out str>> {
    let known: HashSet<&str> = runlist.iter().copied().collect();
    let mut result: Vec<&'out str> = Vec::with_capacity(runlist.len());
    let mut used: HashSet<&'out str> = HashSet::new();
    let mut in_progress: HashSet<&'out str> = HashSet::new();

    // dependencies not yet visited, popped in name order
    let pending = |ident: &'out str| -> Vec<&'out str> {
        dependencies
            .get(ident)
            .map(|deps| {
                deps.iter()
                    .rev()
                    .copied()
                    .filter(|dep| known.contains(dep))
                    .collect()
            })
            .unwrap_or_default()
    };

    // postorder traversal of variables to ensure dependencies are
    // calculated before the variables that reference them.  The stack is
    // explicit so a long chain of references can't overflow.
    for &root in runlist.iter() {
        if used.contains(root) {
            continue;
        }
        in_progress.insert(root);
        let mut stack: Vec<(&'out str, Vec<&'out str>)> = vec![(root, pending(root))];
        while let Some((ident, deps)) = stack.last_mut() {
            let ident = *ident;
            match deps.pop() {
                Some(dep) if used.contains(dep) => {}
                Some(dep) if in_progress.contains(dep) => {
                    let pos = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                    let mut cycle: Vec<&str> = stack[pos..].iter().map(|&(n, _)| n).collect();
                    cycle.push(dep);
                    return model_err!(CircularDependency, cycle.join(" -> "));
                }
                Some(dep) => {
                    in_progress.insert(dep);
                    stack.push((dep, pending(dep)));
                }
                None => {
                    stack.pop();
                    in_progress.remove(ident);
                    used.insert(ident);
                    result.push(ident);
                }
            }
        }
    }

    Ok(result)
}
