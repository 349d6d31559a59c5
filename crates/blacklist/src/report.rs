use std::collections::HashMap;

use autoguard_store::models::RuleFamily;
use serde::Serialize;

/// Per-family counts from one materialize pass. Families are isolated:
/// an error rebuilding one family is recorded here and does not stop
/// the others from proceeding (Error Handling Design's "per-family
/// errors are isolated" rule).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FamilyReport {
    pub global_rules: usize,
    pub scoped_rules: usize,
    pub scopes_written: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializeReport {
    pub per_family: HashMap<RuleFamily, FamilyReport>,
}

impl MaterializeReport {
    pub fn record(&mut self, family: RuleFamily, report: FamilyReport) {
        self.per_family.insert(family, report);
    }

    pub fn has_errors(&self) -> bool {
        self.per_family.values().any(|r| r.error.is_some())
    }
}
