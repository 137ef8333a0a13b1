//! Table dependency graph built from foreign key metadata.
//!
//! Provides:
//! - Dependency graph construction from table and FK listings
//! - Topological sorting (dependencies before dependents)
//! - Cycle detection that reports the offending table and path

use super::{ForeignKeyRef, SchemaSource, TableFilter};
use crate::error::SnapshotError;
use ahash::AHashMap;
use std::collections::VecDeque;

/// Dependency graph over the tables of one schema.
///
/// An edge `dependent -> referenced` means `dependent` has at least one FK
/// pointing at `referenced`. Tables keep discovery order and each table's
/// dependencies keep first-seen order, so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Table names in discovery order
    tables: Vec<String>,
    /// Map from table name to node index
    index: AHashMap<String, usize>,
    /// For each table, the tables it references (deduplicated, may include itself)
    dependencies: Vec<Vec<usize>>,
    /// FK pairs skipped because an endpoint was not a discovered table
    dangling: usize,
}

/// Per-node visitation state during a sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    /// Build a graph from a table listing and FK pairs.
    ///
    /// Every listed table becomes a node even without edges. Duplicate FK
    /// pairs collapse; pairs naming an unknown table are skipped.
    pub fn build<I, S>(tables: I, foreign_keys: &[ForeignKeyRef]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = DependencyGraph::default();
        for table in tables {
            graph.add_table(table.into());
        }
        for fk in foreign_keys {
            graph.add_dependency(&fk.table, &fk.referenced_table);
        }
        graph
    }

    /// Discover tables and foreign keys of `schema` and build the graph
    pub fn discover(source: &dyn SchemaSource, schema: &str) -> Result<Self, SnapshotError> {
        let tables =
            source
                .list_tables(schema)
                .map_err(|e| SnapshotError::SchemaDiscovery {
                    schema: schema.to_string(),
                    operation: "listing tables",
                    source: e,
                })?;
        let foreign_keys =
            source
                .list_foreign_keys(schema)
                .map_err(|e| SnapshotError::SchemaDiscovery {
                    schema: schema.to_string(),
                    operation: "listing foreign keys",
                    source: e,
                })?;
        Ok(Self::build(tables, &foreign_keys))
    }

    /// Add a table node; returns its index. Adding an existing table is a no-op.
    pub fn add_table(&mut self, name: String) -> usize {
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.tables.len();
        self.index.insert(name.clone(), idx);
        self.tables.push(name);
        self.dependencies.push(Vec::new());
        idx
    }

    /// Record that `dependent` references `referenced`.
    ///
    /// Returns false (and counts the pair as dangling) if either table is unknown.
    pub fn add_dependency(&mut self, dependent: &str, referenced: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(dependent), self.index.get(referenced))
        else {
            self.dangling += 1;
            return false;
        };
        if !self.dependencies[from].contains(&to) {
            self.dependencies[from].push(to);
        }
        true
    }

    /// Keep only tables accepted by `filter`, dropping edges to removed tables
    pub fn retain(&mut self, filter: &TableFilter) {
        if filter.is_empty() {
            return;
        }
        let mut kept = DependencyGraph::default();
        for table in self.tables.iter().filter(|t| filter.matches(t)) {
            kept.add_table(table.clone());
        }
        for (from, deps) in self.dependencies.iter().enumerate() {
            for &to in deps {
                let dependent = &self.tables[from];
                let referenced = &self.tables[to];
                if kept.index.contains_key(dependent) && kept.index.contains_key(referenced) {
                    kept.add_dependency(dependent, referenced);
                }
            }
        }
        kept.dangling = self.dangling;
        *self = kept;
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in discovery order
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    /// Tables directly referenced by `table`
    pub fn dependencies(&self, table: &str) -> Vec<&str> {
        self.index
            .get(table)
            .map(|&i| {
                self.dependencies[i]
                    .iter()
                    .map(|&d| self.tables[d].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tables that directly reference `table`
    pub fn dependents(&self, table: &str) -> Vec<&str> {
        let Some(&target) = self.index.get(table) else {
            return Vec::new();
        };
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&target))
            .map(|(i, _)| self.tables[i].as_str())
            .collect()
    }

    /// Number of distinct edges, self-references included
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(Vec::len).sum()
    }

    /// FK pairs that were skipped during construction
    pub fn dangling_references(&self) -> usize {
        self.dangling
    }

    /// Check if a table references itself
    pub fn has_self_reference(&self, table: &str) -> bool {
        self.index
            .get(table)
            .map(|&i| self.dependencies[i].contains(&i))
            .unwrap_or(false)
    }

    /// Tables that reference themselves
    pub fn self_referential_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| self.has_self_reference(t))
            .map(String::as_str)
            .collect()
    }

    /// Root tables (no dependencies other than themselves)
    pub fn root_tables(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(i, deps)| deps.iter().all(|d| d == i))
            .map(|(i, _)| self.tables[i].as_str())
            .collect()
    }

    /// All tables `table` depends on, directly or transitively
    pub fn ancestors(&self, table: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(table) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.len()];
        visited[start] = true;
        let mut queue: VecDeque<usize> = VecDeque::from([start]);
        let mut ancestors = Vec::new();

        while let Some(current) = queue.pop_front() {
            for &dep in &self.dependencies[current] {
                if !visited[dep] {
                    visited[dep] = true;
                    ancestors.push(self.tables[dep].as_str());
                    queue.push_back(dep);
                }
            }
        }

        ancestors
    }

    /// Compute a total order with every table after the tables it references.
    ///
    /// Depth-first over an explicit stack with tristate marks. Roots are taken
    /// in discovery order. Self-references are ignored for cycle purposes.
    /// Reaching a table that is still in progress fails with
    /// [`SnapshotError::CyclicDependency`] naming that table.
    pub fn topo_sort(&self) -> Result<Vec<String>, SnapshotError> {
        let n = self.len();
        let mut marks = vec![Mark::Unvisited; n];
        let mut order = Vec::with_capacity(n);
        // (node, index of next dependency to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                let deps = &self.dependencies[node];

                if *next == deps.len() {
                    marks[node] = Mark::Done;
                    order.push(self.tables[node].clone());
                    stack.pop();
                    continue;
                }

                let dep = deps[*next];
                *next += 1;

                if dep == node {
                    continue;
                }
                match marks[dep] {
                    Mark::Done => {}
                    Mark::InProgress => return Err(self.cycle_error(&stack, dep)),
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                }
            }
        }

        Ok(order)
    }

    /// Build the cycle error from the active DFS path, starting at `dep`
    fn cycle_error(&self, stack: &[(usize, usize)], dep: usize) -> SnapshotError {
        let start = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..]
            .iter()
            .map(|&(n, _)| self.tables[n].clone())
            .collect();
        cycle.push(self.tables[dep].clone());
        SnapshotError::CyclicDependency {
            table: self.tables[dep].clone(),
            cycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(table: &str, referenced: &str) -> ForeignKeyRef {
        ForeignKeyRef::new(table, referenced)
    }

    fn position(order: &[String], table: &str) -> usize {
        order.iter().position(|t| t == table).unwrap()
    }

    #[test]
    fn test_isolated_tables_are_nodes() {
        let graph = DependencyGraph::build(["a", "b", "c"], &[]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.topo_sort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_foreign_keys_collapse() {
        let graph = DependencyGraph::build(
            ["users", "posts"],
            &[fk("posts", "users"), fk("posts", "users")],
        );
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependencies("posts"), vec!["users"]);
        assert_eq!(graph.dependents("users"), vec!["posts"]);
    }

    #[test]
    fn test_unknown_endpoints_are_skipped() {
        let graph = DependencyGraph::build(["posts"], &[fk("posts", "other_schema_users")]);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.dangling_references(), 1);
    }

    #[test]
    fn test_dependency_declared_later_comes_first() {
        let graph = DependencyGraph::build(["child", "parent"], &[fk("child", "parent")]);
        assert_eq!(graph.topo_sort().unwrap(), vec!["parent", "child"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let graph = DependencyGraph::build(["categories"], &[fk("categories", "categories")]);
        assert!(graph.has_self_reference("categories"));
        assert_eq!(graph.topo_sort().unwrap(), vec!["categories"]);
        assert_eq!(graph.root_tables(), vec!["categories"]);
    }

    #[test]
    fn test_three_table_cycle_reports_path() {
        let graph = DependencyGraph::build(
            ["a", "b", "c"],
            &[fk("a", "b"), fk("b", "c"), fk("c", "a")],
        );
        match graph.topo_sort() {
            Err(SnapshotError::CyclicDependency { table, cycle }) => {
                assert_eq!(table, "a");
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_diamond_orders_shared_parent_once() {
        let graph = DependencyGraph::build(
            ["d", "b", "c", "a"],
            &[fk("d", "b"), fk("d", "c"), fk("b", "a"), fk("c", "a")],
        );
        let order = graph.topo_sort().unwrap();
        assert_eq!(order.len(), 4);
        assert!(position(&order, "a") < position(&order, "b"));
        assert!(position(&order, "a") < position(&order, "c"));
        assert!(position(&order, "b") < position(&order, "d"));
        assert!(position(&order, "c") < position(&order, "d"));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let n = 50_000;
        let tables: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
        let fks: Vec<ForeignKeyRef> = (1..n)
            .map(|i| fk(&format!("t{}", i - 1), &format!("t{i}")))
            .collect();
        let graph = DependencyGraph::build(tables, &fks);
        let order = graph.topo_sort().unwrap();
        assert_eq!(order.first().map(String::as_str), Some("t49999"));
        assert_eq!(order.last().map(String::as_str), Some("t0"));
    }

    #[test]
    fn test_retain_drops_filtered_tables_and_edges() {
        let mut graph = DependencyGraph::build(
            ["users", "posts", "audit_log"],
            &[fk("posts", "users"), fk("audit_log", "users")],
        );
        graph.retain(&TableFilter::new(&[], &["audit_*".to_string()]).unwrap());
        assert_eq!(graph.tables(), &["users".to_string(), "posts".to_string()]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_ancestors_are_transitive() {
        let graph = DependencyGraph::build(
            ["users", "projects", "issues"],
            &[fk("projects", "users"), fk("issues", "projects")],
        );
        assert_eq!(graph.ancestors("issues"), vec!["projects", "users"]);
        assert!(graph.ancestors("users").is_empty());
    }
}
