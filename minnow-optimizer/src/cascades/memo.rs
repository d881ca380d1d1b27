// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The memo: groups of equivalent multi-expressions with interning and
//! group merging.

use std::collections::hash_map::DefaultHasher;
use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::trace;

use super::optimizer::{GroupId, MultiExprId};
use crate::cost::Cost;
use crate::error::{Error, OptimizerError};
use crate::nodes::{ArcExpression, ExprChild, Expression, Operator};
use crate::properties::{LogicalProps, LogicalPropsBuilder, PhysicalProps};
use crate::rules::RuleId;

/// An operator applied to groups: the node type of the memo. Equivalent to
/// MExpr in Columbia/Cascades.
#[derive(Debug, Clone)]
pub struct MultiExpr {
    pub op: Operator,
    /// Input groups, canonical at insertion time; canonicalize on use.
    pub children: Vec<GroupId>,
    group: GroupId,
    fired_rules: u64,
}

impl MultiExpr {
    pub fn is_rule_fired(&self, rule: RuleId) -> bool {
        self.fired_rules & (1 << rule) != 0
    }
}

/// The best physical member found so far for one required-property entry.
#[derive(Debug, Clone)]
pub struct WinnerInfo {
    pub expr: MultiExprId,
    pub cost: Cost,
    /// Required properties each input was optimized under; extraction
    /// follows these.
    pub input_props: Vec<PhysicalProps>,
}

#[derive(Debug, Clone, Default)]
pub struct Winner {
    pub best: Option<WinnerInfo>,
    /// Set exactly once, when the optimization pass for this entry's
    /// required properties completes.
    pub ready: bool,
}

/// An equivalence class of multi-expressions.
pub struct Group {
    pub id: GroupId,
    exprs: Vec<MultiExprId>,
    pub logical: Arc<LogicalProps>,
    winners: BTreeMap<PhysicalProps, Winner>,
    pub explored: bool,
    /// Exploration or optimization passes currently in flight; used to cut
    /// cyclic dependencies without recursing forever.
    pub(crate) exploring: bool,
    pub(crate) pending: BTreeSet<PhysicalProps>,
}

impl Group {
    pub fn exprs(&self) -> &[MultiExprId] {
        &self.exprs
    }

    pub fn winner(&self, props: &PhysicalProps) -> Option<&Winner> {
        self.winners.get(props)
    }

    pub fn winners(&self) -> impl Iterator<Item = (&PhysicalProps, &Winner)> {
        self.winners.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    New(MultiExprId),
    /// An equal multi-expression already existed; the memo is unchanged.
    Existing(MultiExprId),
}

impl Inserted {
    pub fn id(&self) -> MultiExprId {
        match self {
            Inserted::New(id) | Inserted::Existing(id) => *id,
        }
    }

    pub fn as_new(&self) -> Option<MultiExprId> {
        match self {
            Inserted::New(id) => Some(*id),
            Inserted::Existing(_) => None,
        }
    }
}

/// The memoized search space. Owns every group and multi-expression; all
/// other parties hold ids.
pub struct SearchSpace {
    groups: Vec<Group>,
    exprs: Vec<MultiExpr>,
    /// Union-find parent table over group ids.
    merged: Vec<GroupId>,
    /// Fingerprint of (operator, canonical children) to candidate ids.
    fingerprints: HashMap<u64, Vec<MultiExprId>>,
    /// Expressions made redundant by a group merge point at their keeper.
    dups: HashMap<MultiExprId, MultiExprId>,
    props: LogicalPropsBuilder,
}

impl SearchSpace {
    pub fn new(props: LogicalPropsBuilder) -> Self {
        Self {
            groups: Vec::new(),
            exprs: Vec::new(),
            merged: Vec::new(),
            fingerprints: HashMap::new(),
            dups: HashMap::new(),
            props,
        }
    }

    /// Resolve a group id to its canonical representative.
    pub fn canonical(&self, mut group: GroupId) -> GroupId {
        while self.merged[group.0] != group {
            group = self.merged[group.0];
        }
        group
    }

    /// Resolve a multi-expression id through the duplicate mapping left
    /// behind by group merges.
    pub fn resolve(&self, mut id: MultiExprId) -> MultiExprId {
        while let Some(&next) = self.dups.get(&id) {
            id = next;
        }
        id
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[self.canonical(id).0]
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        let id = self.canonical(id);
        &mut self.groups[id.0]
    }

    pub fn mexpr(&self, id: MultiExprId) -> &MultiExpr {
        &self.exprs[self.resolve(id).0]
    }

    pub fn mexpr_group(&self, id: MultiExprId) -> GroupId {
        self.canonical(self.exprs[self.resolve(id).0].group)
    }

    /// Number of live (canonical) groups.
    pub fn group_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| self.canonical(g.id) == g.id)
            .count()
    }

    /// Number of live multi-expressions; the estimated plan-space size.
    pub fn expr_count(&self) -> usize {
        self.exprs.len() - self.dups.len()
    }

    pub fn is_rule_fired(&self, id: MultiExprId, rule: RuleId) -> bool {
        self.mexpr(id).is_rule_fired(rule)
    }

    pub fn mark_rule_fired(
        &mut self,
        id: MultiExprId,
        rule: RuleId,
        rule_name: &'static str,
    ) -> Result<(), OptimizerError> {
        let id = self.resolve(id);
        let expr = &mut self.exprs[id.0];
        let bit = 1u64 << rule;
        if expr.fired_rules & bit != 0 {
            return Err(OptimizerError::RuleFiredTwice {
                rule: rule_name,
                expr: id,
            });
        }
        expr.fired_rules |= bit;
        Ok(())
    }

    /// The winner entry for `(group, props)`, created lazily.
    pub fn winner_entry(&mut self, group: GroupId, props: PhysicalProps) -> &mut Winner {
        self.group_mut(group).winners.entry(props).or_default()
    }

    /// Insert an expression bottom-up, interning every sub-expression. A
    /// second insertion of an equal expression returns the existing
    /// multi-expression and leaves the memo unchanged.
    pub fn insert(&mut self, expr: &ArcExpression) -> Result<(GroupId, Inserted), Error> {
        self.insert_inner(expr, None)
    }

    /// Insert a rule substitute into an existing group. Finding that the
    /// expression already lives in a different group merges the two.
    pub fn insert_into(
        &mut self,
        expr: &ArcExpression,
        group: GroupId,
    ) -> Result<(GroupId, Inserted), Error> {
        self.insert_inner(expr, Some(group))
    }

    fn insert_inner(
        &mut self,
        expr: &Expression,
        target: Option<GroupId>,
    ) -> Result<(GroupId, Inserted), Error> {
        let mut children = Vec::with_capacity(expr.children.len());
        for child in &expr.children {
            match child {
                ExprChild::Group(g) => children.push(self.canonical(*g)),
                ExprChild::Expr(sub) => {
                    let (group, _) = self.insert_inner(sub, None)?;
                    children.push(group);
                }
            }
        }
        if let Some(existing) = self.lookup(&expr.op, &children) {
            let existing_group = self.mexpr_group(existing);
            let group = match target {
                Some(target) => {
                    let target = self.canonical(target);
                    if target != existing_group {
                        self.merge(target, existing_group);
                    }
                    self.canonical(target)
                }
                None => existing_group,
            };
            return Ok((group, Inserted::Existing(self.resolve(existing))));
        }

        let id = MultiExprId(self.exprs.len());
        let group = match target {
            Some(target) => self.canonical(target),
            None => self.new_group(&expr.op, &children)?,
        };
        let fingerprint = self.fingerprint(&expr.op, &children);
        self.exprs.push(MultiExpr {
            op: expr.op.clone(),
            children,
            group,
            fired_rules: 0,
        });
        self.groups[group.0].exprs.push(id);
        self.fingerprints.entry(fingerprint).or_default().push(id);
        trace!(event = "add_expr_to_group", group = %group, expr = %id, op = %self.exprs[id.0].op);
        Ok((group, Inserted::New(id)))
    }

    fn new_group(&mut self, op: &Operator, children: &[GroupId]) -> Result<GroupId, Error> {
        let child_props: Vec<Arc<LogicalProps>> = children
            .iter()
            .map(|&g| self.group(g).logical.clone())
            .collect();
        let child_refs: Vec<&LogicalProps> = child_props.iter().map(|p| p.as_ref()).collect();
        let logical = self.props.derive(op, &child_refs)?;
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            id,
            exprs: Vec::new(),
            logical: Arc::new(logical),
            winners: BTreeMap::new(),
            explored: false,
            exploring: false,
            pending: BTreeSet::new(),
        });
        self.merged.push(id);
        Ok(id)
    }

    fn fingerprint(&self, op: &Operator, children: &[GroupId]) -> u64 {
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        for &child in children {
            self.canonical(child).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Look up the exact equal of `(op, children)`; children must already
    /// be canonical.
    fn lookup(&self, op: &Operator, children: &[GroupId]) -> Option<MultiExprId> {
        let fingerprint = self.fingerprint(op, children);
        let candidates = self.fingerprints.get(&fingerprint)?;
        for &candidate in candidates {
            let resolved = self.resolve(candidate);
            let expr = &self.exprs[resolved.0];
            if &expr.op != op || expr.children.len() != children.len() {
                continue;
            }
            let same = expr
                .children
                .iter()
                .zip(children)
                .all(|(&a, &b)| self.canonical(a) == self.canonical(b));
            if same {
                return Some(resolved);
            }
        }
        None
    }

    /// Unify two equivalence classes. Parents referencing the folded group
    /// may collapse into duplicates or reveal further equivalences, so this
    /// iterates to a fixed point.
    pub(crate) fn merge(&mut self, a: GroupId, b: GroupId) {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            let x = self.canonical(x);
            let y = self.canonical(y);
            if x == y {
                continue;
            }
            // The smaller id stays canonical so dumps remain stable.
            let (keep, fold) = if x.0 <= y.0 { (x, y) } else { (y, x) };
            trace!(event = "merge_group", keep = %keep, fold = %fold);
            self.merged[fold.0] = keep;

            let moved = std::mem::take(&mut self.groups[fold.0].exprs);
            self.groups[keep.0].exprs.extend(moved);
            let folded_winners = std::mem::take(&mut self.groups[fold.0].winners);
            let folded_pending = std::mem::take(&mut self.groups[fold.0].pending);
            let fold_explored = self.groups[fold.0].explored;
            let fold_exploring = self.groups[fold.0].exploring;
            let kept = &mut self.groups[keep.0];
            let keep_started = kept.pending.clone();
            kept.explored = kept.explored && fold_explored;
            kept.exploring = kept.exploring || fold_exploring;
            kept.pending.extend(folded_pending);
            for (props, winner) in folded_winners {
                // A pass still in flight on the kept group must stay the
                // one that finalizes this entry.
                let in_flight = keep_started.contains(&props)
                    && !kept.winners.get(&props).map(|w| w.ready).unwrap_or(false);
                match kept.winners.entry(props) {
                    btree_map::Entry::Vacant(slot) => {
                        let mut winner = winner;
                        if in_flight {
                            winner.ready = false;
                        }
                        slot.insert(winner);
                    }
                    btree_map::Entry::Occupied(mut slot) => {
                        let entry = slot.get_mut();
                        if let Some(best) = winner.best {
                            let better = entry
                                .best
                                .as_ref()
                                .map(|b| best.cost < b.cost)
                                .unwrap_or(true);
                            if better {
                                entry.best = Some(best);
                            }
                        }
                        if !in_flight {
                            entry.ready = entry.ready || winner.ready;
                        }
                    }
                }
            }

            pending.extend(self.collapse_duplicates());
        }
    }

    /// After a merge, equal multi-expressions may have landed in one group
    /// (drop the younger) or across two groups (those groups are
    /// equivalent; report them for merging).
    fn collapse_duplicates(&mut self) -> Vec<(GroupId, GroupId)> {
        use std::collections::hash_map::Entry;

        let mut seen: HashMap<(Operator, Vec<GroupId>), MultiExprId> = HashMap::new();
        let mut discovered = Vec::new();
        for raw in 0..self.exprs.len() {
            let id = MultiExprId(raw);
            if self.dups.contains_key(&id) {
                continue;
            }
            let key = (
                self.exprs[raw].op.clone(),
                self.exprs[raw]
                    .children
                    .iter()
                    .map(|&c| self.canonical(c))
                    .collect::<Vec<_>>(),
            );
            match seen.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
                Entry::Occupied(slot) => {
                    let keeper = self.resolve(*slot.get());
                    let keeper_group = self.mexpr_group(keeper);
                    let dup_group = self.mexpr_group(id);
                    if keeper_group == dup_group {
                        trace!(event = "collapse_expr", keep = %keeper, fold = %id);
                        let fired = self.exprs[raw].fired_rules;
                        self.exprs[keeper.0].fired_rules |= fired;
                        self.dups.insert(id, keeper);
                        self.groups[dup_group.0].exprs.retain(|&e| e != id);
                    } else {
                        discovered.push((keeper_group, dup_group));
                    }
                }
            }
        }
        discovered
    }

    fn display_mexpr(&self, id: MultiExprId) -> String {
        let expr = self.mexpr(id);
        let mut out = format!("({}", expr.op);
        for &child in &expr.children {
            let _ = write!(out, " {}", self.canonical(child));
        }
        out.push(')');
        out
    }

    /// Deterministic dump of groups, members, and winners; the contract
    /// regression tests pin down.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            if self.canonical(group.id) != group.id {
                let _ = writeln!(out, "group {} merged into {}", group.id, self.canonical(group.id));
                continue;
            }
            let _ = writeln!(
                out,
                "group {} cardinality={:.2} schema={}",
                group.id, group.logical.cardinality, group.logical.schema
            );
            for &expr in &group.exprs {
                let _ = writeln!(out, "  {}: {}", expr, self.display_mexpr(expr));
            }
            for (props, winner) in &group.winners {
                let state = if winner.ready { " ready" } else { "" };
                match &winner.best {
                    Some(info) => {
                        let _ = writeln!(
                            out,
                            "  winner[{}] = {} cost={}{}",
                            props, info.expr, info.cost, state
                        );
                    }
                    None => {
                        let _ = writeln!(out, "  winner[{}] = none{}", props, state);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{ColumnRef, TableRef};
    use crate::test_fixtures::{fixture_catalog, get, join};
    use crate::properties::LogicalPropsBuilder;

    fn space() -> SearchSpace {
        SearchSpace::new(LogicalPropsBuilder::new(fixture_catalog()))
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut space = space();
        let expr = join(get("Sailors", "S"), get("Reserves", "R"));
        let (g1, first) = space.insert(&expr).unwrap();
        let groups = space.group_count();
        let exprs = space.expr_count();
        let (g2, second) = space.insert(&expr).unwrap();
        assert!(matches!(first, Inserted::New(_)));
        assert!(matches!(second, Inserted::Existing(_)));
        assert_eq!(first.id(), second.id());
        assert_eq!(g1, g2);
        assert_eq!(space.group_count(), groups);
        assert_eq!(space.expr_count(), exprs);
    }

    #[test]
    fn commuted_join_lands_in_the_same_group() {
        let mut space = space();
        let (group, _) = space
            .insert(&join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let commuted = Expression::new(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Reserves", "R", "sid")],
                right_keys: vec![ColumnRef::new("Sailors", "S", "sid")],
            },
            vec![
                ExprChild::Group(space.insert(&get("Reserves", "R")).unwrap().0),
                ExprChild::Group(space.insert(&get("Sailors", "S")).unwrap().0),
            ],
        );
        let (g2, inserted) = space.insert_into(&commuted, group).unwrap();
        assert_eq!(g2, group);
        assert!(inserted.as_new().is_some());
        assert_eq!(space.group(group).exprs().len(), 2);
    }

    #[test]
    fn merging_child_groups_cascades_to_parents() {
        let mut space = space();
        // Two joins that differ only in their right input group.
        let (g_join_1, _) = space
            .insert(&join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let boats = Expression::leaf(Operator::GetTable(TableRef::new("Boats", "B")));
        let join_2 = Expression::new(
            Operator::EquiJoin {
                left_keys: vec![ColumnRef::new("Sailors", "S", "sid")],
                right_keys: vec![ColumnRef::new("Reserves", "R", "sid")],
            },
            vec![
                ExprChild::Expr(get("Sailors", "S")),
                ExprChild::Expr(boats.clone()),
            ],
        );
        let (g_join_2, _) = space.insert(&join_2).unwrap();
        assert_ne!(g_join_1, g_join_2);

        // Declare Reserves and Boats equivalent; the parent joins follow.
        let (g_reserves, _) = space.insert(&get("Reserves", "R")).unwrap();
        let (g_boats, _) = space.insert(&boats).unwrap();
        space.merge(g_reserves, g_boats);
        assert_eq!(space.canonical(g_join_1), space.canonical(g_join_2));
        // The two join members collapsed into one.
        assert_eq!(
            space.group(g_join_1).exprs().len(),
            1,
            "duplicate member should collapse:\n{}",
            space.dump()
        );
    }

    #[test]
    fn rule_bits_set_once_and_stay_set() {
        let mut space = space();
        let (_, inserted) = space.insert(&get("Sailors", "S")).unwrap();
        let id = inserted.id();
        assert!(!space.is_rule_fired(id, 3));
        space.mark_rule_fired(id, 3, "some_rule").unwrap();
        assert!(space.is_rule_fired(id, 3));
        assert!(matches!(
            space.mark_rule_fired(id, 3, "some_rule"),
            Err(OptimizerError::RuleFiredTwice { .. })
        ));
        assert!(space.is_rule_fired(id, 3));
    }

    #[test]
    fn dump_is_stable() {
        let mut space = space();
        space
            .insert(&join(get("Sailors", "S"), get("Reserves", "R")))
            .unwrap();
        let dump = space.dump();
        assert_eq!(dump, space.dump());
        assert!(dump.contains("group !0"));
        assert!(dump.contains("EquiJoin"));
    }
}
