// Community → property cascading select.
//
// Owner, tenant, maintenance and bill forms pick a property through its
// community. The property select only offers properties of the selected
// community and is disabled until one is chosen.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::form::SelectOption;
use crate::workflow::{FieldChangeHook, FormContext, OnLoadHook};

pub const COMMUNITY_FIELD: &str = "community";
pub const PROPERTY_FIELD: &str = "property";

/// Hooks wiring the cascade into a `CrudRequestConfig`.
pub fn property_cascade() -> (OnLoadHook, FieldChangeHook) {
    let on_load: OnLoadHook =
        Arc::new(|ctx: FormContext| async move { refresh_properties(&ctx).await }.boxed());
    let on_change: FieldChangeHook = Arc::new(|ctx: FormContext, field: String| {
        async move {
            if field == COMMUNITY_FIELD {
                refresh_properties(&ctx).await;
            }
        }
        .boxed()
    });
    (on_load, on_change)
}

/// Rebuild the property options for the selected community.
///
/// The current property stays selected when the new list still offers it,
/// which is what keeps an edit form's value intact on load.
pub async fn refresh_properties(ctx: &FormContext) {
    let has_property = ctx
        .with_form(|form| form.field(PROPERTY_FIELD).is_some())
        .unwrap_or(false);
    if !has_property {
        return;
    }

    let community = ctx
        .value(COMMUNITY_FIELD)
        .map(|v| v.trim().to_owned())
        .unwrap_or_default();

    if community.is_empty() {
        ctx.with_form(|form| {
            let _ = form.replace_options(
                PROPERTY_FIELD,
                vec![SelectOption::new("", "Select a community first")],
            );
            let _ = form.set_disabled(PROPERTY_FIELD, true);
            form.set_required(PROPERTY_FIELD, false);
        });
        return;
    }

    debug!(%community, "loading properties");
    match ctx.bridge.lookup_properties(&community).await {
        Ok(properties) => {
            let mut options = Vec::with_capacity(properties.len() + 1);
            if properties.is_empty() {
                options.push(SelectOption::new("", "No properties in this community"));
            } else {
                options.push(SelectOption::new("", "Select a property"));
                options.extend(
                    properties
                        .iter()
                        .map(|p| SelectOption::new(p.id.clone(), p.label())),
                );
            }
            let enabled = !properties.is_empty();
            ctx.with_form(|form| {
                let _ = form.replace_options(PROPERTY_FIELD, options);
                let _ = form.set_disabled(PROPERTY_FIELD, !enabled);
                form.set_required(PROPERTY_FIELD, enabled);
            });
        }
        Err(e) => {
            warn!(%community, error = %e, "property lookup failed");
            ctx.with_form(|form| {
                let _ = form.replace_options(
                    PROPERTY_FIELD,
                    vec![SelectOption::new("", "Failed to load properties")],
                );
                let _ = form.set_disabled(PROPERTY_FIELD, true);
            });
            ctx.notifier
                .error(format!("Failed to load properties: {}", e.user_message()));
        }
    }
}
