use std::collections::HashMap;
use std::sync::Arc;

use autoguard_fast::{keys, FastStore};
use autoguard_store::models::{GeoBlockType, RuleFamily, Scope, UaPatternType};
use autoguard_store::Database;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::MaterializeResult;
use crate::report::{FamilyReport, MaterializeReport};

/// Projects the authoritative store's rule families into the fast
/// lookup store. Every family's materialized form is written with the
/// double-buffer + rename strategy `autoguard_fast` exposes, so readers
/// never observe a half-applied scope+family — per the spec's explicit
/// preference over delete-then-fill, grounded on the same atomic-swap
/// discipline as a block-index hot reload, Redis `RENAME` standing in
/// for an in-process pointer swap.
pub struct Materializer {
    store: Arc<Database>,
    fast: Arc<FastStore>,
}

#[derive(Debug, Serialize)]
struct UaEntry {
    pattern: String,
    #[serde(rename = "type")]
    pattern_type: UaPatternType,
}

impl Materializer {
    pub fn new(store: Arc<Database>, fast: Arc<FastStore>) -> Self {
        Self { store, fast }
    }

    pub async fn materialize_all(&self) -> MaterializeResult<MaterializeReport> {
        let mut report = MaterializeReport::default();
        for family in RuleFamily::ALL {
            let family_report = self.materialize_family(family).await;
            match family_report {
                Ok(r) => report.record(family, r),
                Err(e) => {
                    warn!(family = ?family, error = %e, "materialize family failed");
                    report.record(
                        family,
                        FamilyReport {
                            error: Some(e.to_string()),
                            ..Default::default()
                        },
                    );
                }
            }
        }
        info!(has_errors = report.has_errors(), "materializeAll complete");
        Ok(report)
    }

    pub async fn materialize_family(&self, family: RuleFamily) -> MaterializeResult<FamilyReport> {
        match family {
            RuleFamily::Ip => self.materialize_ip().await,
            RuleFamily::IpRange => self.materialize_ip_ranges().await,
            RuleFamily::Ua => self.materialize_uas().await,
            RuleFamily::Isp => self.materialize_isps().await,
            RuleFamily::Geo => self.materialize_geos().await,
        }
    }

    async fn materialize_ip(&self) -> MaterializeResult<FamilyReport> {
        let rows = self.store.blacklist().list_effective_ips().await?;
        let known = self.store.blacklist().list_known_scopes(RuleFamily::Ip.table_name()).await?;
        let mut by_scope: HashMap<Scope, Vec<String>> = HashMap::new();
        for row in &rows {
            by_scope
                .entry(scope_of(row.user_id))
                .or_default()
                .push(row.ip_address.clone());
        }
        let rewrite = scopes_to_rewrite(&by_scope, &known);
        for scope in &rewrite {
            let key = keys::blacklist_ip(&scope.as_key_fragment());
            let members = by_scope.get(scope).cloned().unwrap_or_default();
            self.fast.replace_set_via_rename(&key, &members).await?;
        }
        Ok(FamilyReport {
            global_rules: by_scope.get(&Scope::Global).map(Vec::len).unwrap_or(0),
            scoped_rules: rows.len(),
            scopes_written: rewrite.len(),
            error: None,
        })
    }

    async fn materialize_ip_ranges(&self) -> MaterializeResult<FamilyReport> {
        let rows = self.store.blacklist().list_effective_ip_ranges().await?;
        let known = self
            .store
            .blacklist()
            .list_known_scopes(RuleFamily::IpRange.table_name())
            .await?;
        let mut by_scope: HashMap<Scope, Vec<String>> = HashMap::new();
        for row in &rows {
            by_scope
                .entry(scope_of(row.user_id))
                .or_default()
                .push(row.cidr.clone());
        }
        let rewrite = scopes_to_rewrite(&by_scope, &known);
        for scope in &rewrite {
            let key = keys::blacklist_ip_ranges(&scope.as_key_fragment());
            let cidrs = by_scope.get(scope).cloned().unwrap_or_default();
            // CIDR's materialized form is a single opaque JSON scalar —
            // the hot path linear-scans it per request rather than
            // testing set membership, so a plain SET is already atomic.
            self.fast.set_json(&key, &cidrs).await?;
        }
        Ok(FamilyReport {
            global_rules: by_scope.get(&Scope::Global).map(Vec::len).unwrap_or(0),
            scoped_rules: rows.len(),
            scopes_written: rewrite.len(),
            error: None,
        })
    }

    async fn materialize_uas(&self) -> MaterializeResult<FamilyReport> {
        let rows = self.store.blacklist().list_effective_uas().await?;
        let known = self.store.blacklist().list_known_scopes(RuleFamily::Ua.table_name()).await?;
        let mut by_scope: HashMap<Scope, Vec<String>> = HashMap::new();
        for row in &rows {
            let entry = UaEntry {
                pattern: row.pattern.clone(),
                pattern_type: row.pattern_type,
            };
            let json = serde_json::to_string(&entry).unwrap_or_default();
            by_scope.entry(scope_of(row.user_id)).or_default().push(json);
        }
        let rewrite = scopes_to_rewrite(&by_scope, &known);
        for scope in &rewrite {
            let key = keys::blacklist_uas(&scope.as_key_fragment());
            let entries = by_scope.get(scope).cloned().unwrap_or_default();
            self.fast.replace_list_via_rename(&key, &entries).await?;
        }
        Ok(FamilyReport {
            global_rules: by_scope.get(&Scope::Global).map(Vec::len).unwrap_or(0),
            scoped_rules: rows.len(),
            scopes_written: rewrite.len(),
            error: None,
        })
    }

    async fn materialize_isps(&self) -> MaterializeResult<FamilyReport> {
        let rows = self.store.blacklist().list_effective_isps().await?;
        let known = self.store.blacklist().list_known_scopes(RuleFamily::Isp.table_name()).await?;
        let mut asns_by_scope: HashMap<Scope, Vec<String>> = HashMap::new();
        let mut names_by_scope: HashMap<Scope, Vec<(String, String)>> = HashMap::new();
        for row in &rows {
            let scope = scope_of(row.user_id);
            if let Some(asn) = row.asn {
                asns_by_scope.entry(scope).or_default().push(asn.to_string());
                if let Some(name) = &row.isp_name {
                    names_by_scope
                        .entry(scope)
                        .or_default()
                        .push((asn.to_string(), name.clone()));
                }
            }
        }
        let rewrite = scopes_to_rewrite(&asns_by_scope, &known);
        for scope in &rewrite {
            let key = keys::blacklist_isps(&scope.as_key_fragment());
            let asns = asns_by_scope.get(scope).cloned().unwrap_or_default();
            self.fast.replace_set_via_rename(&key, &asns).await?;

            let names_key = keys::blacklist_isp_names(&scope.as_key_fragment());
            let names = names_by_scope.get(scope).cloned().unwrap_or_default();
            self.fast.replace_hash_via_rename(&names_key, &names).await?;
        }
        Ok(FamilyReport {
            global_rules: asns_by_scope.get(&Scope::Global).map(Vec::len).unwrap_or(0),
            scoped_rules: rows.len(),
            scopes_written: rewrite.len(),
            error: None,
        })
    }

    async fn materialize_geos(&self) -> MaterializeResult<FamilyReport> {
        let rows = self.store.blacklist().list_effective_geos().await?;
        let known = self.store.blacklist().list_known_scopes(RuleFamily::Geo.table_name()).await?;
        let mut by_scope: HashMap<Scope, Vec<(String, String)>> = HashMap::new();
        for row in &rows {
            let field = match &row.region_code {
                Some(region) => format!("{}:{}", row.country_code, region),
                None => row.country_code.clone(),
            };
            let value = match row.block_type {
                GeoBlockType::Block => "block",
                GeoBlockType::HighRisk => "high_risk",
            };
            by_scope
                .entry(scope_of(row.user_id))
                .or_default()
                .push((field, value.to_string()));
        }
        let rewrite = scopes_to_rewrite(&by_scope, &known);
        for scope in &rewrite {
            let key = keys::blacklist_geos(&scope.as_key_fragment());
            let fields = by_scope.get(scope).cloned().unwrap_or_default();
            self.fast.replace_hash_via_rename(&key, &fields).await?;
        }
        Ok(FamilyReport {
            global_rules: by_scope.get(&Scope::Global).map(Vec::len).unwrap_or(0),
            scoped_rules: rows.len(),
            scopes_written: rewrite.len(),
            error: None,
        })
    }

    /// Deactivates expired rules in A, then re-materializes exactly the
    /// families that had a row expire — families with no expired rows
    /// are left untouched this tick.
    pub async fn cleanup_expired(&self) -> MaterializeResult<MaterializeReport> {
        let touched_tables = self.store.blacklist().deactivate_expired().await?;
        let mut report = MaterializeReport::default();
        for family in RuleFamily::ALL {
            if touched_tables.contains(&family.table_name()) {
                let family_report = self.materialize_family(family).await?;
                report.record(family, family_report);
            }
        }
        Ok(report)
    }

    /// On-demand delta: mutates both A (already done by the caller
    /// before invoking this) and the single affected scope key in B.
    /// Per spec: if this fails, the handler must still consider the
    /// operator's request successful — the next scheduled materialize
    /// reconciles — so callers should log, not propagate, failures
    /// from this method when it's on a request-handling path.
    pub async fn apply_ip_delta(&self, scope: Scope, ip_address: &str, add: bool) -> MaterializeResult<()> {
        let key = keys::blacklist_ip(&scope.as_key_fragment());
        if add {
            self.fast.sadd(&key, ip_address).await?;
        } else {
            self.fast.srem(&key, ip_address).await?;
        }
        Ok(())
    }

    pub async fn apply_isp_delta(&self, scope: Scope, asn: i64, add: bool) -> MaterializeResult<()> {
        let key = keys::blacklist_isps(&scope.as_key_fragment());
        if add {
            self.fast.sadd(&key, &asn.to_string()).await?;
        } else {
            self.fast.srem(&key, &asn.to_string()).await?;
        }
        Ok(())
    }

    pub async fn apply_geo_delta(
        &self,
        scope: Scope,
        field: &str,
        block_type: Option<GeoBlockType>,
    ) -> MaterializeResult<()> {
        let key = keys::blacklist_geos(&scope.as_key_fragment());
        match block_type {
            Some(GeoBlockType::Block) => self.fast.hset(&key, field, "block").await?,
            Some(GeoBlockType::HighRisk) => self.fast.hset(&key, field, "high_risk").await?,
            None => self.fast.hdel(&key, field).await?,
        }
        Ok(())
    }
}

fn scope_of(user_id: Option<i64>) -> Scope {
    match user_id {
        Some(id) => Scope::User(id),
        None => Scope::Global,
    }
}

/// Scopes that must be rewritten this pass: every scope with a
/// currently-effective rule, plus every scope that owns *any* row in
/// the family's table (active or not). Without the latter, a scope
/// whose last rule just expired or got deactivated would keep its
/// stale materialized key forever — `materialize_*` only iterates
/// scopes present in its `by_scope` map, which omits scopes that just
/// dropped to zero effective rules.
fn scopes_to_rewrite<V>(
    by_scope: &HashMap<Scope, V>,
    known_user_ids: &[Option<i64>],
) -> Vec<Scope> {
    let mut scopes: std::collections::HashSet<Scope> = by_scope.keys().copied().collect();
    scopes.insert(Scope::Global);
    for user_id in known_user_ids {
        scopes.insert(scope_of(*user_id));
    }
    scopes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_of_maps_none_to_global() {
        assert_eq!(scope_of(None), Scope::Global);
        assert_eq!(scope_of(Some(9)), Scope::User(9));
    }
}
