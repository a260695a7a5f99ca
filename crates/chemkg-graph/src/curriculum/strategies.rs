//! The eight built-in ordering strategies.

use super::{Ordering, OrderingStrategy, Subset};
use crate::community::detect_where;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Kahn's algorithm; ready nodes are taken by descending mention count.
pub struct TopologicalOrder;

impl OrderingStrategy for TopologicalOrder {
    fn name(&self) -> &'static str {
        "topological"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let n = subset.len();
        let mut in_degree: Vec<usize> = (0..n).map(|i| subset.adjacency.in_degree(i)).collect();
        let mut ready: BTreeSet<(Reverse<u64>, usize)> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| (Reverse(subset.mentions[i]), i))
            .collect();

        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while let Some(first) = ready.pop_first() {
            let i = first.1;
            order.push(i);
            placed[i] = true;
            for &(j, _) in &subset.adjacency.successors[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.insert((Reverse(subset.mentions[j]), j));
                }
            }
        }

        let mut cycle: Vec<usize> = (0..n).filter(|&i| !placed[i]).collect();
        cycle.sort_by_key(|&i| (Reverse(subset.mentions[i]), i));
        order.extend(&cycle);
        Ordering { order, cycle }
    }
}

/// Descending reverse rank; edges are ignored.
pub struct RankOrder;

impl OrderingStrategy for RankOrder {
    fn name(&self) -> &'static str {
        "rank"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        Ordering::acyclic(subset.by_rank.clone())
    }
}

/// Greedy: the highest-ranked node whose prerequisites are all placed.
///
/// When nothing is ready the highest-ranked remaining node is forced, so
/// the walk always terminates.
pub struct HybridOrder;

impl OrderingStrategy for HybridOrder {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let n = subset.len();
        let rank_pos = subset.rank_positions();
        let mut in_degree: Vec<usize> = (0..n).map(|i| subset.adjacency.in_degree(i)).collect();
        // Both sets hold rank positions, so the first element is the best.
        let mut remaining: BTreeSet<usize> = (0..n).collect();
        let mut ready: BTreeSet<usize> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| rank_pos[i])
            .collect();

        let mut order = Vec::with_capacity(n);
        let mut cycle = Vec::new();
        while let Some(&best) = remaining.first() {
            let pos = match ready.pop_first() {
                Some(pos) => pos,
                None => {
                    cycle.push(subset.by_rank[best]);
                    best
                }
            };
            remaining.remove(&pos);
            let i = subset.by_rank[pos];
            order.push(i);
            for &(j, _) in &subset.adjacency.successors[i] {
                if in_degree[j] == 0 {
                    continue;
                }
                in_degree[j] -= 1;
                if in_degree[j] == 0 && remaining.contains(&rank_pos[j]) {
                    ready.insert(rank_pos[j]);
                }
            }
        }
        Ordering { order, cycle }
    }
}

/// Descending mention count.
pub struct CoverageOrder;

impl OrderingStrategy for CoverageOrder {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let mut order: Vec<usize> = (0..subset.len()).collect();
        order.sort_by_key(|&i| (Reverse(subset.mentions[i]), i));
        Ordering::acyclic(order)
    }
}

fn seeds(subset: &Subset<'_>) -> Vec<usize> {
    subset
        .by_rank
        .iter()
        .copied()
        .take(subset.config.seed_count)
        .collect()
}

fn append_unvisited(order: &mut Vec<usize>, visited: &[bool]) {
    order.extend((0..visited.len()).filter(|&i| !visited[i]));
}

/// Depth-first walk from the top reverse-rank seeds.
///
/// Uses an explicit stack; successors are pushed lowest rank first so the
/// preorder matches a recursive walk visiting the highest rank first.
pub struct DfsFromCore;

impl OrderingStrategy for DfsFromCore {
    fn name(&self) -> &'static str {
        "dfs"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let n = subset.len();
        let rank_pos = subset.rank_positions();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);

        for seed in seeds(subset) {
            let mut stack = vec![seed];
            while let Some(i) = stack.pop() {
                if visited[i] {
                    continue;
                }
                visited[i] = true;
                order.push(i);
                let next = subset.successors_by_rank(i, &rank_pos);
                stack.extend(next.into_iter().rev().filter(|&j| !visited[j]));
            }
        }

        append_unvisited(&mut order, &visited);
        Ordering::acyclic(order)
    }
}

/// Breadth-first walk from the top reverse-rank seeds.
pub struct BfsFromCore;

impl OrderingStrategy for BfsFromCore {
    fn name(&self) -> &'static str {
        "bfs"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let n = subset.len();
        let rank_pos = subset.rank_positions();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut queue: VecDeque<usize> = seeds(subset).into();

        while let Some(i) = queue.pop_front() {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            order.push(i);
            for j in subset.successors_by_rank(i, &rank_pos) {
                if !visited[j] {
                    queue.push_back(j);
                }
            }
        }

        append_unvisited(&mut order, &visited);
        Ordering::acyclic(order)
    }
}

/// Communities by summed reverse rank, members by reverse rank.
///
/// Subset nodes outside any detected community form singleton groups.
pub struct CommunityOrder;

impl OrderingStrategy for CommunityOrder {
    fn name(&self) -> &'static str {
        "community"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let members: HashSet<&str> = subset.ids.iter().copied().collect();
        let detected = detect_where(subset.graph, &subset.config.community, |node| {
            members.contains(node.id.as_str())
        });
        let rank_pos = subset.rank_positions();

        let mut groups: Vec<Vec<usize>> = detected
            .communities
            .iter()
            .map(|c| {
                c.members
                    .iter()
                    .filter_map(|id| subset.adjacency.position(id))
                    .collect()
            })
            .collect();
        groups.extend(
            (0..subset.len())
                .filter(|&i| !detected.assignments.contains_key(subset.ids[i]))
                .map(|i| vec![i]),
        );

        for group in &mut groups {
            group.sort_by_key(|&i| rank_pos[i]);
        }
        let total = |g: &Vec<usize>| -> f64 { g.iter().map(|&i| subset.ranks[i]).sum() };
        let lead = |g: &Vec<usize>| g.first().map(|&i| rank_pos[i]);
        groups.sort_by(|a, b| total(b).total_cmp(&total(a)).then_with(|| lead(a).cmp(&lead(b))));

        Ordering::acyclic(groups.into_iter().flatten().collect())
    }
}

/// Ascending size of the full transitive prerequisite closure.
///
/// The closure is taken over the whole enabling graph, not just the subset.
pub struct DifficultyOrder;

impl OrderingStrategy for DifficultyOrder {
    fn name(&self) -> &'static str {
        "difficulty"
    }

    fn order(&self, subset: &Subset<'_>) -> Ordering {
        let full = subset.graph.enabling_adjacency();
        let closure: Vec<usize> = subset
            .ids
            .iter()
            .map(|id| {
                full.position(id)
                    .map(|start| {
                        let mut seen = vec![false; full.len()];
                        seen[start] = true;
                        let mut queue = VecDeque::from([start]);
                        let mut count = 0;
                        while let Some(u) = queue.pop_front() {
                            for &(p, _) in &full.predecessors[u] {
                                if !seen[p] {
                                    seen[p] = true;
                                    count += 1;
                                    queue.push_back(p);
                                }
                            }
                        }
                        count
                    })
                    .unwrap_or(0)
            })
            .collect();

        let mut order: Vec<usize> = (0..subset.len()).collect();
        order.sort_by_key(|&i| (closure[i], Reverse(subset.mentions[i]), i));
        Ordering::acyclic(order)
    }
}
