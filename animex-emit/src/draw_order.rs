//! Draw order recovery from place-after links
//!
//! Each instance records the instance it renders immediately above. The
//! links form a forest rooted at instances without a link; flattening it
//! parent-first and reversing gives the order children are added in.

use crate::{Error, Result};
use std::collections::HashMap;

/// One instance as seen by the draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawItem {
    pub id: u32,
    pub start_frame: u32,
    pub place_after: Option<u32>,
}

#[derive(Debug)]
struct Node {
    id: u32,
    start_frame: u32,
    children: Vec<usize>,
}

/// Returns the instance ids in add order.
///
/// Siblings are ordered by ascending start frame, ties keeping input order.
/// A link to an unknown instance or a cycle is an error.
pub fn draw_order(items: &[DrawItem]) -> Result<Vec<u32>> {
    let mut nodes: Vec<Node> = Vec::with_capacity(items.len());
    let mut index: HashMap<u32, usize> = HashMap::with_capacity(items.len());
    for item in items {
        if index.insert(item.id, nodes.len()).is_some() {
            return Err(Error::MalformedExport(format!(
                "instance {} listed twice in draw order",
                item.id
            )));
        }
        nodes.push(Node {
            id: item.id,
            start_frame: item.start_frame,
            children: Vec::new(),
        });
    }

    let mut roots = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.place_after {
            None => roots.push(i),
            Some(parent) => {
                let parent = *index.get(&parent).ok_or_else(|| {
                    Error::MalformedExport(format!(
                        "instance {} is placed after unknown instance {}",
                        item.id, parent
                    ))
                })?;
                nodes[parent].children.push(i);
            }
        }
    }

    roots.sort_by_key(|i| nodes[*i].start_frame);
    for i in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[i].children);
        children.sort_by_key(|c| nodes[*c].start_frame);
        nodes[i].children = children;
    }

    let mut order = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    let mut stack: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        order.push(nodes[i].id);
        stack.extend(nodes[i].children.iter().rev());
    }

    if order.len() != nodes.len() {
        let stuck: Vec<String> = nodes
            .iter()
            .zip(&visited)
            .filter(|(_, seen)| !**seen)
            .map(|(node, _)| node.id.to_string())
            .collect();
        return Err(Error::MalformedExport(format!(
            "place-after cycle through instances {}",
            stuck.join(", ")
        )));
    }

    order.reverse();
    Ok(order)
}
