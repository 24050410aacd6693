//! Built-in rule families.

pub mod cross_cutting;
pub mod http;
pub mod naming;
pub mod nesting;

use crate::rule::BuiltinRule;

/// Every built-in rule, grouped by family in catalog order.
pub fn builtin_rules() -> Vec<BuiltinRule> {
    let mut rules = naming::rules();
    rules.extend(nesting::rules());
    rules.extend(http::rules());
    rules.extend(cross_cutting::rules());
    rules
}
