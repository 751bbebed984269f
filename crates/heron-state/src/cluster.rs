//! Factoring of transitions that share a source, a trigger and a leading run of actions into a
//! choice pseudo-state.

use crate::model::Transition;
use indexmap::IndexMap;

/// One group of transitions as laid out by a diagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Cluster {
    /// Transitions drawn as they are.
    Plain(Vec<Transition>),
    /// A shared prefix `common` leading into the choice `id`, which fans out into `clusters`.
    Choice {
        id: String,
        common: Transition,
        clusters: Vec<Cluster>,
    },
}

impl Cluster {
    /// Choice ids in depth-first order.
    pub fn choice_ids(clusters: &[Cluster]) -> Vec<&str> {
        let mut out = Vec::new();
        collect_choices(clusters, &mut out);
        out
    }
}

fn collect_choices<'a>(clusters: &'a [Cluster], out: &mut Vec<&'a str>) {
    for c in clusters {
        if let Cluster::Choice { id, clusters, .. } = c {
            out.push(id.as_str());
            collect_choices(clusters, out);
        }
    }
}

/// Every transition in one plain group, for charts laid out without choices.
pub fn unclustered(transitions: &[Transition]) -> Vec<Cluster> {
    if transitions.is_empty() {
        Vec::new()
    } else {
        vec![Cluster::Plain(transitions.to_vec())]
    }
}

/// Groups transitions by source and trigger, in order of first appearance, and factors each
/// group's common action prefix out into a choice.
pub fn cluster_transitions(transitions: &[Transition]) -> Vec<Cluster> {
    let mut groups: IndexMap<(&str, Option<&str>), Vec<&Transition>> = IndexMap::new();
    for t in transitions {
        groups
            .entry((t.from.as_str(), t.trigger.as_deref()))
            .or_default()
            .push(t);
    }

    groups
        .into_values()
        .map(|group| {
            let plain = || Cluster::Plain(group.iter().map(|t| (*t).clone()).collect());
            if group.len() == 1 {
                return plain();
            }
            let shared = common_prefix_len(&group);
            if shared == 0 {
                return plain();
            }

            let first = group[0];
            let choice = format!("c.{}", first.id);
            let common = Transition {
                id: format!("p.{}", first.id),
                from: first.from.clone(),
                to: choice.clone(),
                trigger: first.trigger.clone(),
                action: first.action[..shared].to_vec(),
                size: None,
            };
            let tails: Vec<Transition> = group
                .iter()
                .map(|t| Transition {
                    id: t.id.clone(),
                    from: choice.clone(),
                    to: t.to.clone(),
                    trigger: None,
                    action: t.action[shared..].to_vec(),
                    size: None,
                })
                .collect();
            Cluster::Choice {
                id: choice,
                common,
                clusters: cluster_transitions(&tails),
            }
        })
        .collect()
}

fn common_prefix_len(group: &[&Transition]) -> usize {
    let first = &group[0].action;
    (0..first.len())
        .take_while(|&i| group.iter().all(|t| t.action.get(i) == Some(&first[i])))
        .count()
}
