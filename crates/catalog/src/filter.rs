//! Stack predicates used when merging registry results

use crate::models::{Stack, StackQuery};

/// Exact match on the stack name
pub fn matches_name(stack: &Stack, exact_name: &str) -> bool {
    stack.name == exact_name
}

/// Case-insensitive substring match over name, display name and description
pub fn matches_text(stack: &Stack, text: &str) -> bool {
    let needle = text.to_lowercase();
    [&stack.name, &stack.display_name, &stack.description]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Keep the stacks satisfying every filter set on the query, in order
pub fn apply(stacks: Vec<Stack>, query: &StackQuery) -> Vec<Stack> {
    stacks
        .into_iter()
        .filter(|stack| query.name_filter().is_none_or(|name| matches_name(stack, name)))
        .filter(|stack| query.text_filter().is_none_or(|text| matches_text(stack, text)))
        .collect()
}
