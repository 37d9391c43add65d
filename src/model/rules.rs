use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::tags::{TagMask, TagSelector, TagSet};

/// A static match predicate seeding the initial state of new clients.
///
/// Every present predicate must hold for the rule to match. Class and instance
/// are case-sensitive substring matches as in dwm; `title_regex` is matched
/// against the window title.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub class: Option<String>,
    pub instance: Option<String>,
    pub title: Option<String>,
    pub title_regex: Option<String>,
    /// Tags to place the window on. Empty means the monitor's viewed tags.
    #[serde(default)]
    pub tags: Vec<TagSelector>,
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub no_swallow: bool,
    /// Preferred monitor index. Absent means the selected monitor.
    pub monitor: Option<usize>,
}

impl Rule {
    pub fn validate(&self, index: usize, tags: &TagSet) -> Vec<String> {
        let mut issues = Vec::new();
        if self.class.is_none()
            && self.instance.is_none()
            && self.title.is_none()
            && self.title_regex.is_none()
        {
            issues.push(format!(
                "Rule {index} has no class, instance, title or title_regex specified"
            ));
        }
        if let Some(ref re) = self.title_regex {
            if re.is_empty() {
                issues.push(format!("Rule {index} has empty title_regex"));
            } else if let Err(e) = Regex::new(re) {
                issues.push(format!("Rule {index} has invalid title_regex '{re}': {e}"));
            }
        }
        for selector in &self.tags {
            if tags.resolve(selector).is_none() {
                issues.push(format!("Rule {index} references unknown tag {selector:?}"));
            }
        }
        issues
    }
}

/// The state a rule seeds a new client with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleOutcome {
    pub tags: TagMask,
    pub floating: bool,
    pub terminal: bool,
    pub no_swallow: bool,
    pub monitor: Option<usize>,
}

struct CachedRule {
    rule: Rule,
    tags: TagMask,
    compiled_title_regex: Option<Regex>,
}

/// Rules in declaration order. The first matching rule wins.
pub struct RuleSet {
    cached_rules: Vec<CachedRule>,
}

impl RuleSet {
    /// Invalid regexes and unknown tags are logged and skipped; validation
    /// reports them to the user separately.
    pub fn new(rules: &[Rule], tags: &TagSet) -> Self {
        let cached_rules = rules
            .iter()
            .map(|rule| {
                let compiled_title_regex = rule.title_regex.as_ref().and_then(|re| {
                    Regex::new(re)
                        .map_err(|e| warn!("Invalid title_regex '{}' in rule: {}", re, e))
                        .ok()
                });
                let tags = rule
                    .tags
                    .iter()
                    .filter_map(|s| tags.resolve(s))
                    .fold(TagMask::EMPTY, |acc, m| acc | m);
                CachedRule {
                    rule: rule.clone(),
                    tags,
                    compiled_title_regex,
                }
            })
            .collect();
        Self { cached_rules }
    }

    pub fn apply(&self, class: &str, instance: &str, title: &str) -> RuleOutcome {
        self.find_matching_rule(class, instance, title)
            .map(|cached| RuleOutcome {
                tags: cached.tags,
                floating: cached.rule.floating,
                terminal: cached.rule.terminal,
                no_swallow: cached.rule.no_swallow,
                monitor: cached.rule.monitor,
            })
            .unwrap_or_default()
    }

    fn find_matching_rule(&self, class: &str, instance: &str, title: &str) -> Option<&CachedRule> {
        self.cached_rules.iter().find(|cached| {
            let rule = &cached.rule;
            if let Some(ref c) = rule.class
                && !class.contains(c.as_str())
            {
                return false;
            }
            if let Some(ref i) = rule.instance
                && !instance.contains(i.as_str())
            {
                return false;
            }
            if let Some(ref t) = rule.title
                && !title.contains(t.as_str())
            {
                return false;
            }
            if rule.title_regex.is_some() {
                match cached.compiled_title_regex {
                    Some(ref re) if re.is_match(title) => {}
                    _ => return false,
                }
            }
            true
        })
    }
}
