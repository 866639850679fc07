//! Hierarchy algorithms over flat menu item lists.
//!
//! Items only carry a parent id. Every operation here builds a throwaway
//! index (id -> position, position -> child positions) from the flat list it
//! is given and never keeps a linked graph around.

use crate::domain::menu_item::MenuItem;
use std::collections::{HashMap, HashSet, VecDeque};

pub const PATH_SEPARATOR: &str = " > ";

/// A menu item together with its ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub item: MenuItem,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Total number of nodes in a forest.
pub fn forest_size(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::node_count).sum()
}

/// Builds an ordered forest from a flat list of items.
///
/// An item becomes a root when it has no parent or when its parent is not part
/// of `items`. This keeps children visible in role-filtered subsets where the
/// parent itself was filtered out. Siblings are ordered by `order`; equal
/// orders keep their input order.
///
/// Each input item appears exactly once in the output. If the parent pointers
/// contain a cycle, the first member of the cycle (in input order) is promoted
/// to a root so the rest of the cycle hangs below it.
pub fn build_tree(items: Vec<MenuItem>) -> Vec<TreeNode> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        index.entry(item.id).or_insert(pos);
    }

    let mut parent_of: Vec<Option<usize>> = vec![None; items.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (pos, item) in items.iter().enumerate() {
        match item.parent_id.and_then(|pid| index.get(&pid).copied()) {
            Some(parent) if parent != pos => {
                parent_of[pos] = Some(parent);
                children[parent].push(pos);
            }
            _ => roots.push(pos),
        }
    }

    // Anything not reachable from a root sits on a parent cycle.
    let mut reached = vec![false; items.len()];
    mark_reachable(&roots, &children, &mut reached);
    for pos in 0..items.len() {
        if reached[pos] {
            continue;
        }
        if let Some(parent) = parent_of[pos].take() {
            children[parent].retain(|&c| c != pos);
        }
        roots.push(pos);
        mark_reachable(&[pos], &children, &mut reached);
    }

    roots.sort_by_key(|&pos| items[pos].order);
    for siblings in children.iter_mut() {
        siblings.sort_by_key(|&pos| items[pos].order);
    }

    let mut slots: Vec<Option<MenuItem>> = items.into_iter().map(Some).collect();
    roots
        .iter()
        .filter_map(|&pos| assemble(pos, &mut slots, &children))
        .collect()
}

fn mark_reachable(start: &[usize], children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack: Vec<usize> = start.to_vec();
    while let Some(pos) = stack.pop() {
        if reached[pos] {
            continue;
        }
        reached[pos] = true;
        stack.extend(children[pos].iter().copied());
    }
}

fn assemble(pos: usize, slots: &mut [Option<MenuItem>], children: &[Vec<usize>]) -> Option<TreeNode> {
    let item = slots[pos].take()?;
    let children = children[pos]
        .iter()
        .filter_map(|&child| assemble(child, slots, children))
        .collect();
    Some(TreeNode { item, children })
}

/// Ids of every item that has `root_id` as a strict ancestor.
///
/// `root_id` itself is never part of the result, even if corrupt data makes
/// it reachable from its own descendants.
pub fn collect_descendant_ids(root_id: i64, items: &[MenuItem]) -> HashSet<i64> {
    let mut by_parent: HashMap<i64, Vec<i64>> = HashMap::new();
    for item in items {
        if let Some(parent_id) = item.parent_id {
            by_parent.entry(parent_id).or_default().push(item.id);
        }
    }

    let mut descendants = HashSet::new();
    let mut frontier = VecDeque::from([root_id]);
    while let Some(current) = frontier.pop_front() {
        let Some(child_ids) = by_parent.get(&current) else {
            continue;
        };
        for &child_id in child_ids {
            if child_id != root_id && descendants.insert(child_id) {
                frontier.push_back(child_id);
            }
        }
    }
    descendants
}

/// Items that may become the parent of `item_id`, ordered by name.
///
/// Excludes the item itself and all of its descendants. With `None` (a new
/// item) every item is a candidate.
pub fn available_parents(item_id: Option<i64>, items: &[MenuItem]) -> Vec<&MenuItem> {
    let excluded = match item_id {
        Some(id) => {
            let mut excluded = collect_descendant_ids(id, items);
            excluded.insert(id);
            excluded
        }
        None => HashSet::new(),
    };

    let mut candidates: Vec<&MenuItem> = items
        .iter()
        .filter(|item| !excluded.contains(&item.id))
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates
}

/// Checks whether re-parenting `item_id` under `new_parent_id` would make the
/// item its own ancestor.
///
/// Walks up from the proposed parent. The walk is capped at the item count so
/// an already corrupt chain cannot loop forever.
pub fn would_create_cycle(item_id: i64, new_parent_id: i64, items: &[MenuItem]) -> bool {
    if item_id == new_parent_id {
        return true;
    }
    let parents: HashMap<i64, Option<i64>> = items.iter().map(|i| (i.id, i.parent_id)).collect();

    let mut current = Some(new_parent_id);
    let mut steps = 0;
    while let Some(id) = current {
        if id == item_id {
            return true;
        }
        if steps > parents.len() {
            break;
        }
        steps += 1;
        current = parents.get(&id).copied().flatten();
    }
    false
}

/// Read-only lookup over a flat item list for derived hierarchy values.
pub struct MenuIndex<'a> {
    by_id: HashMap<i64, &'a MenuItem>,
}

impl<'a> MenuIndex<'a> {
    pub fn new(items: &'a [MenuItem]) -> Self {
        Self {
            by_id: items.iter().map(|item| (item.id, item)).collect(),
        }
    }

    pub fn get(&self, id: i64) -> Option<&'a MenuItem> {
        self.by_id.get(&id).copied()
    }

    /// Ancestors of `item`, nearest parent first.
    ///
    /// Stops at the first parent id that is not indexed, and never takes more
    /// steps than there are items.
    pub fn ancestors(&self, item: &MenuItem) -> Vec<&'a MenuItem> {
        let mut chain = Vec::new();
        let mut next = item.parent_id;
        while let Some(parent_id) = next {
            if chain.len() >= self.by_id.len() || parent_id == item.id {
                break;
            }
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            chain.push(parent);
            next = parent.parent_id;
        }
        chain
    }

    /// Number of ancestor hops to a root. Roots are level 0.
    pub fn level(&self, item: &MenuItem) -> usize {
        self.ancestors(item).len()
    }

    /// Ancestor names and the item's own name, root first, joined by `" > "`.
    pub fn full_path(&self, item: &MenuItem) -> String {
        let mut names: Vec<&str> = self
            .ancestors(item)
            .iter()
            .rev()
            .map(|ancestor| ancestor.name.as_str())
            .collect();
        names.push(item.name.as_str());
        names.join(PATH_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: i64, parent_id: Option<i64>, order: i32) -> MenuItem {
        MenuItem {
            id,
            name: format!("item-{id}"),
            link: None,
            open_mode: None,
            order,
            parent_id,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn ids(nodes: &[TreeNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.item.id).collect()
    }

    #[test]
    fn test_build_tree_nests_and_orders_children() {
        let forest = build_tree(vec![item(3, Some(1), 2), item(2, Some(1), 1), item(1, None, 1)]);
        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].children), vec![2, 3]);
    }

    #[test]
    fn test_build_tree_promotes_orphans() {
        let forest = build_tree(vec![item(3, Some(1), 2)]);
        assert_eq!(ids(&forest), vec![3]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_build_tree_stable_on_equal_order() {
        let forest = build_tree(vec![item(5, None, 1), item(4, None, 1), item(6, None, 0)]);
        assert_eq!(ids(&forest), vec![6, 5, 4]);
    }

    #[test]
    fn test_build_tree_breaks_cycles() {
        let forest = build_tree(vec![item(1, Some(2), 1), item(2, Some(1), 1), item(3, None, 2)]);
        assert_eq!(forest_size(&forest), 3);
        assert_eq!(ids(&forest), vec![1, 3]);
        assert_eq!(ids(&forest[0].children), vec![2]);
    }

    #[test]
    fn test_build_tree_self_parent_is_root() {
        let forest = build_tree(vec![item(7, Some(7), 1)]);
        assert_eq!(ids(&forest), vec![7]);
    }

    #[test]
    fn test_build_tree_empty() {
        assert!(build_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_collect_descendants() {
        let items = vec![item(1, None, 1), item(2, Some(1), 1), item(3, Some(2), 1), item(4, None, 2)];
        assert_eq!(collect_descendant_ids(1, &items), HashSet::from([2, 3]));
        assert!(collect_descendant_ids(3, &items).is_empty());
        assert!(collect_descendant_ids(99, &items).is_empty());
    }

    #[test]
    fn test_collect_descendants_terminates_on_cycle() {
        let items = vec![item(1, Some(3), 1), item(2, Some(1), 1), item(3, Some(2), 1)];
        assert_eq!(collect_descendant_ids(1, &items), HashSet::from([2, 3]));
    }

    #[test]
    fn test_available_parents_excludes_subtree() {
        let mut items = vec![item(1, None, 1), item(2, Some(1), 1), item(3, Some(2), 1), item(4, None, 2)];
        items[3].name = "Alpha".to_string();
        let candidates: Vec<i64> = available_parents(Some(1), &items).iter().map(|i| i.id).collect();
        assert_eq!(candidates, vec![4]);

        let all: Vec<i64> = available_parents(None, &items).iter().map(|i| i.id).collect();
        assert_eq!(all, vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_would_create_cycle() {
        let items = vec![item(1, None, 1), item(2, Some(1), 1), item(3, Some(2), 1), item(4, None, 2)];
        assert!(would_create_cycle(1, 3, &items));
        assert!(would_create_cycle(2, 2, &items));
        assert!(!would_create_cycle(3, 4, &items));
        assert!(!would_create_cycle(4, 3, &items));
    }

    #[test]
    fn test_level_and_full_path() {
        let mut items = vec![item(1, None, 1), item(2, Some(1), 1), item(3, Some(2), 1)];
        items[0].name = "Admin".to_string();
        items[1].name = "Users".to_string();
        items[2].name = "Roles".to_string();
        let index = MenuIndex::new(&items);
        assert_eq!(index.level(&items[0]), 0);
        assert_eq!(index.level(&items[2]), 2);
        assert_eq!(index.full_path(&items[2]), "Admin > Users > Roles");
    }

    #[test]
    fn test_level_is_bounded_on_corrupt_chain() {
        let items = vec![item(1, Some(2), 1), item(2, Some(1), 1)];
        let index = MenuIndex::new(&items);
        assert!(index.level(&items[0]) <= items.len());
    }
}
