//! Sub-question decomposition and dependency ordering.

use chemkg_llm::{Decomposition, SubQuestion};
use std::collections::{HashMap, HashSet, VecDeque};

/// Sub-questions in answering order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedQuestions {
    pub order: Vec<SubQuestion>,
    /// Ids appended in declared order because a cycle blocked them.
    pub cycle: Vec<u32>,
}

impl OrderedQuestions {
    pub fn position(&self, id: u32) -> Option<usize> {
        self.order.iter().position(|sq| sq.id == id)
    }
}

/// Drop repeated ids, self-dependencies and dependencies on unknown ids,
/// then keep at most `max` sub-questions.
pub fn sanitize(mut decomposition: Decomposition, max: usize) -> Decomposition {
    let mut seen = HashSet::new();
    decomposition.sub_questions.retain(|sq| seen.insert(sq.id));
    decomposition.truncate(max);

    let ids: HashSet<u32> = decomposition.sub_questions.iter().map(|sq| sq.id).collect();
    for sq in &mut decomposition.sub_questions {
        let own = sq.id;
        let mut kept = HashSet::new();
        sq.depends_on
            .retain(|d| *d != own && ids.contains(d) && kept.insert(*d));
    }
    decomposition
}

/// Kahn's sort over declared dependencies. Ready sub-questions are taken in
/// declared order; anything a cycle blocks is appended in declared order.
pub fn order(sub_questions: &[SubQuestion]) -> OrderedQuestions {
    let index: HashMap<u32, usize> = sub_questions
        .iter()
        .enumerate()
        .map(|(i, sq)| (sq.id, i))
        .collect();

    let mut in_degree = vec![0usize; sub_questions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); sub_questions.len()];
    for (i, sq) in sub_questions.iter().enumerate() {
        for dep in &sq.depends_on {
            if let Some(&j) = index.get(dep) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..sub_questions.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; sub_questions.len()];
    let mut order = Vec::with_capacity(sub_questions.len());

    while let Some(i) = queue.pop_front() {
        placed[i] = true;
        order.push(sub_questions[i].clone());
        for &k in &dependents[i] {
            in_degree[k] -= 1;
            if in_degree[k] == 0 {
                queue.push_back(k);
            }
        }
    }

    let mut cycle = Vec::new();
    for (i, sq) in sub_questions.iter().enumerate() {
        if !placed[i] {
            cycle.push(sq.id);
            order.push(sq.clone());
        }
    }

    OrderedQuestions { order, cycle }
}
