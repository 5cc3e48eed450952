//! The safe decay-condition grammar (§4.6, §9 "Dynamic expressions → safe
//! closed grammar").
//!
//! No code is ever built or executed at runtime. A condition string is
//! matched against a small, closed set of shapes — whitelisted property
//! comparisons, `keywords.includes(...)`, the two `daysSince*()` helpers,
//! `metadata.<key>` comparisons, combined with `&&`/`||` — and anything
//! outside that grammar evaluates to `false` rather than erroring (§8
//! "Safe expression closure").

use crate::types::Memory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            _ => None,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Ne => (lhs - rhs).abs() >= f64::EPSILON,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }

    fn apply_str(self, lhs: &str, rhs: &str) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            // Ordering on strings outside of the closed grammar's intent;
            // treated as always-false (unsupported shape, §8).
            _ => false,
        }
    }
}

static PROPERTY_CMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(importance|resonance|accessCount)\s*(==|!=|<=|>=|<|>)\s*([0-9]*\.?[0-9]+)\s*$").unwrap()
});
static KEYWORDS_INCLUDES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*keywords\.includes\(\s*"([^"]*)"\s*\)\s*$"#).unwrap());
static DAYS_SINCE_CREATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*daysSinceCreated\(\)\s*(==|!=|<=|>=|<|>)\s*([0-9]*\.?[0-9]+)\s*$").unwrap());
static DAYS_SINCE_ACCESSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*daysSinceAccessed\(\)\s*(==|!=|<=|>=|<|>)\s*([0-9]*\.?[0-9]+)\s*$").unwrap());
static METADATA_CMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*metadata\.([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=|<=|>=|<|>)\s*("[^"]*"|[0-9]*\.?[0-9]+|true|false)\s*$"#).unwrap()
});

/// Evaluate `condition` against `memory`. Returns `false` (never errors)
/// for any string outside the grammar, logging a warning exactly once per
/// call (§4.6, §8).
#[must_use]
pub fn evaluate(condition: &str, memory: &Memory, now_ms: i64) -> bool {
    if condition.trim().is_empty() {
        return false;
    }
    eval_or(condition, memory, now_ms)
}

fn eval_or(expr: &str, memory: &Memory, now_ms: i64) -> bool {
    split_top_level(expr, "||")
        .into_iter()
        .any(|term| eval_and(term, memory, now_ms))
}

fn eval_and(expr: &str, memory: &Memory, now_ms: i64) -> bool {
    split_top_level(expr, "&&")
        .into_iter()
        .all(|atom| eval_atom(atom, memory, now_ms))
}

/// Split on a top-level occurrence of `sep` (`&&` binds tighter than `||`,
/// so `eval_or` splits first). No parentheses are supported by the
/// grammar, so a plain substring split is sufficient.
fn split_top_level<'a>(expr: &'a str, sep: &str) -> Vec<&'a str> {
    if expr.contains(sep) {
        expr.split(sep).map(str::trim).collect()
    } else {
        vec![expr.trim()]
    }
}

fn eval_atom(atom: &str, memory: &Memory, now_ms: i64) -> bool {
    if let Some(caps) = PROPERTY_CMP.captures(atom) {
        let property = &caps[1];
        let Some(op) = CompareOp::parse(&caps[2]) else {
            return reject(atom);
        };
        let Ok(rhs) = caps[3].parse::<f64>() else {
            return reject(atom);
        };
        let lhs = match property {
            "importance" => memory.importance,
            "resonance" => memory.resonance,
            "accessCount" => memory.access_count as f64,
            _ => return reject(atom),
        };
        return op.apply(lhs, rhs);
    }

    if let Some(caps) = KEYWORDS_INCLUDES.captures(atom) {
        return memory.keywords.contains(&caps[1]);
    }

    if let Some(caps) = DAYS_SINCE_CREATED.captures(atom) {
        let Some(op) = CompareOp::parse(&caps[1]) else {
            return reject(atom);
        };
        let Ok(rhs) = caps[2].parse::<f64>() else {
            return reject(atom);
        };
        return op.apply(memory.days_since_created(now_ms), rhs);
    }

    if let Some(caps) = DAYS_SINCE_ACCESSED.captures(atom) {
        let Some(op) = CompareOp::parse(&caps[1]) else {
            return reject(atom);
        };
        let Ok(rhs) = caps[2].parse::<f64>() else {
            return reject(atom);
        };
        return op.apply(memory.days_since_accessed(now_ms), rhs);
    }

    if let Some(caps) = METADATA_CMP.captures(atom) {
        let key = &caps[1];
        let Some(op) = CompareOp::parse(&caps[2]) else {
            return reject(atom);
        };
        let raw_rhs = &caps[3];
        let Some(actual) = memory.metadata.get(key) else {
            return false;
        };
        return compare_metadata(actual, op, raw_rhs);
    }

    reject(atom)
}

fn compare_metadata(actual: &Value, op: CompareOp, raw_rhs: &str) -> bool {
    if let Some(stripped) = raw_rhs.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return actual.as_str().is_some_and(|s| op.apply_str(s, stripped));
    }
    if raw_rhs == "true" || raw_rhs == "false" {
        let expected = raw_rhs == "true";
        return actual.as_bool().is_some_and(|b| op.apply_str(&b.to_string(), &expected.to_string()));
    }
    if let Ok(rhs) = raw_rhs.parse::<f64>() {
        return actual.as_f64().is_some_and(|lhs| op.apply(lhs, rhs));
    }
    false
}

fn reject(atom: &str) -> bool {
    warn!(condition = atom, "decay condition is outside the safe grammar, treating as no match");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, MemoryId, MemoryType, UserId};

    fn memory() -> Memory {
        let mut m = Memory::new(
            MemoryId::from("m1"),
            UserId::from("u1"),
            AgentId::from("a1"),
            "content",
            MemoryType::Semantic,
            0.5,
            0,
            0,
        )
        .unwrap();
        m.resonance = 0.2;
        m.keywords.insert("urgent".to_string());
        m.metadata.insert("tag".to_string(), serde_json::json!("beta"));
        m
    }

    #[test]
    fn simple_property_comparison() {
        let m = memory();
        assert!(evaluate("importance < 0.6", &m, 0));
        assert!(!evaluate("importance > 0.6", &m, 0));
    }

    #[test]
    fn keywords_includes() {
        let m = memory();
        assert!(evaluate(r#"keywords.includes("urgent")"#, &m, 0));
        assert!(!evaluate(r#"keywords.includes("other")"#, &m, 0));
    }

    #[test]
    fn days_since_created_and_accessed() {
        let m = memory();
        let ten_days = 10 * 86_400_000;
        assert!(evaluate("daysSinceCreated() > 5", &m, ten_days));
        assert!(evaluate("daysSinceAccessed() > 5", &m, ten_days));
    }

    #[test]
    fn metadata_comparison() {
        let m = memory();
        assert!(evaluate(r#"metadata.tag == "beta""#, &m, 0));
        assert!(!evaluate(r#"metadata.tag == "gamma""#, &m, 0));
    }

    #[test]
    fn and_or_combinations() {
        let m = memory();
        assert!(evaluate("importance < 0.6 && resonance < 0.5", &m, 0));
        assert!(!evaluate("importance > 0.6 && resonance < 0.5", &m, 0));
        assert!(evaluate("importance > 0.6 || resonance < 0.5", &m, 0));
    }

    #[test]
    fn unsupported_shape_is_false_not_error() {
        let m = memory();
        assert!(!evaluate("process.exit(1)", &m, 0));
        assert!(!evaluate("", &m, 0));
        assert!(!evaluate("importance << 0.5", &m, 0));
    }
}
