// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cost and usage aggregation
//!
//! The provider's usage report is a flat stream of line items, one per
//! SKU per time bucket.  The aggregator drains every page, drops zero
//! quantities, and folds the rest into one row per (SKU, unit), ordered
//! by cost so the expensive line items surface first.

use chrono::DateTime;
use chrono::Utc;
use console_common::model::Subscription;
use console_common::model::UsageLineItem;
use console_common::model::UsageSummary;
use console_common::ListResultVec;
use console_common::ResourceType;
use console_provider::UsageQuery;
use slog::debug;
use std::collections::HashMap;
use uuid::Uuid;

impl super::Orchestrator {
    pub async fn get_usage_summary(
        &self,
        tenant_id: Uuid,
        time_started: DateTime<Utc>,
        time_ended: DateTime<Utc>,
        granularity: &str,
    ) -> ListResultVec<UsageSummary> {
        let tenant = self.tenant(tenant_id).await?;
        let usage = self.factory().usage(&tenant).await?;

        let mut items = Vec::new();
        let mut page = None::<String>;
        let mut pages = 0usize;
        loop {
            let query = UsageQuery {
                tenancy_id: tenant.tenancy_id.clone(),
                time_started,
                time_ended,
                granularity: granularity.to_owned(),
                page: page.clone(),
            };
            let batch = usage
                .request_summarized_usage(&query)
                .await
                .map_err(|e| {
                    e.into_error(ResourceType::Tenant, &tenant.tenancy_id)
                })?;
            items.extend(batch.items);
            pages += 1;
            match batch.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }
        debug!(
            self.log(), "drained usage report";
            "tenant" => &tenant.display_name,
            "pages" => pages,
            "line_items" => items.len(),
        );
        Ok(summarize_usage(items))
    }

    pub async fn list_subscriptions(
        &self,
        tenant_id: Uuid,
    ) -> ListResultVec<Subscription> {
        let tenant = self.tenant(tenant_id).await?;
        let subscriptions = self.factory().subscriptions(&tenant).await?;
        subscriptions
            .list_subscriptions(&tenant.tenancy_id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::Tenant, &tenant.tenancy_id)
            })
    }
}

/// Folds raw line items into per-(SKU, unit) totals, sorted by descending
/// cost, then service and SKU name for a stable order among free items.
pub(crate) fn summarize_usage(items: Vec<UsageLineItem>) -> Vec<UsageSummary> {
    let mut sku_units: HashMap<String, String> = HashMap::new();
    let mut groups: HashMap<(String, String), UsageSummary> = HashMap::new();

    for item in items {
        let quantity = match item.computed_quantity {
            Some(q) if q > 0.0 => q,
            _ => continue,
        };
        let sku_name = item
            .sku_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| String::from("Unknown SKU"));
        let unit = resolve_unit(&mut sku_units, &sku_name, item.unit.as_deref());
        let cost = item.computed_amount.unwrap_or(0.0);

        let entry = groups
            .entry((sku_name.clone(), unit.clone()))
            .or_insert_with(|| UsageSummary {
                service: item
                    .service
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| String::from("Other")),
                sku_name,
                unit,
                total_quantity: 0.0,
                total_cost: 0.0,
            });
        entry.total_quantity += quantity;
        entry.total_cost += cost;
    }

    let mut summaries: Vec<UsageSummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| {
        b.total_cost
            .total_cmp(&a.total_cost)
            .then_with(|| a.service.cmp(&b.service))
            .then_with(|| a.sku_name.cmp(&b.sku_name))
    });
    summaries
}

/// Determines the unit for a line item: the reported unit when present,
/// otherwise a unit previously seen for the same SKU, otherwise a guess
/// from the SKU name.
fn resolve_unit(
    sku_units: &mut HashMap<String, String>,
    sku_name: &str,
    reported: Option<&str>,
) -> String {
    if let Some(unit) = reported.filter(|u| !u.is_empty()) {
        sku_units.insert(sku_name.to_owned(), unit.to_owned());
        return unit.to_owned();
    }
    if let Some(unit) = sku_units.get(sku_name) {
        return unit.clone();
    }
    let unit = infer_unit(sku_name);
    sku_units.insert(sku_name.to_owned(), unit.clone());
    unit
}

fn infer_unit(sku_name: &str) -> String {
    let name = sku_name.to_uppercase();
    let unit = if name.contains("OCPU") || name.contains("CPU") {
        "OCPU Hours"
    } else if name.contains("MEMORY") {
        "GB Hours"
    } else if name.contains("STORAGE")
        || name.contains("VOLUME")
        || name.contains("BACKUP")
    {
        "GB Months"
    } else if name.contains("BANDWIDTH")
        || name.contains("DATA TRANSFER")
        || name.contains("OUTBOUND")
    {
        "GB"
    } else if name.contains("DATABASE") {
        "Instance Hours"
    } else {
        "Units"
    };
    unit.to_owned()
}
