// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service limit and quota reporting

use console_common::model::LimitValue;
use console_common::model::QuotaEntry;
use console_common::model::ServiceSummary;
use console_common::ListResultVec;
use console_common::ResourceType;
use slog::debug;
use uuid::Uuid;

impl super::Orchestrator {
    pub async fn list_limit_services(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
    ) -> ListResultVec<ServiceSummary> {
        let tenant = self.tenant(tenant_id).await?;
        let limits = self.factory().limits(&tenant, region).await?;
        let compartment = tenant.effective_compartment();
        limits
            .list_services(compartment)
            .await
            .map_err(|e| e.into_error(ResourceType::ServiceLimit, compartment))
    }

    /// Reports every non-zero limit of a service with its consumption,
    /// most-utilized first.
    ///
    /// Zero-valued limits are noise (services advertise every limit they
    /// know, including ones this tenancy has no entitlement to) and are
    /// dropped.  Availability lookups are best-effort: a limit whose
    /// consumption cannot be read is reported as unused rather than
    /// omitted.
    pub async fn get_service_quotas(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        service_name: &str,
    ) -> ListResultVec<QuotaEntry> {
        let tenant = self.tenant(tenant_id).await?;
        let limits = self.factory().limits(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let mut values: Vec<LimitValue> = Vec::new();
        let mut page = None::<String>;
        loop {
            let batch = limits
                .list_limit_values(compartment, service_name, page.as_deref())
                .await
                .map_err(|e| {
                    e.into_error(ResourceType::ServiceLimit, service_name)
                })?;
            values.extend(batch.items);
            match batch.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }

        let mut entries = Vec::new();
        for limit in values {
            if limit.value == 0 {
                continue;
            }
            let (used, available) = match limits
                .get_resource_availability(
                    compartment,
                    service_name,
                    &limit.name,
                    limit.availability_domain.as_deref(),
                )
                .await
            {
                Ok(availability) => {
                    (availability.used, availability.available)
                }
                Err(e) => {
                    debug!(
                        self.log(), "availability lookup failed";
                        "service" => service_name,
                        "limit" => &limit.name,
                        "error" => %e,
                    );
                    (0, limit.value)
                }
            };
            let usage_rate = used as f64 / limit.value as f64 * 100.0;
            entries.push(QuotaEntry {
                service_name: service_name.to_owned(),
                limit_name: limit.name,
                scope_type: limit.scope_type,
                availability_domain: limit.availability_domain,
                quota: limit.value,
                used,
                available,
                usage_rate,
            });
        }

        entries.sort_by(|a, b| {
            b.usage_rate
                .total_cmp(&a.usage_rate)
                .then_with(|| a.limit_name.cmp(&b.limit_name))
        });
        Ok(entries)
    }
}
