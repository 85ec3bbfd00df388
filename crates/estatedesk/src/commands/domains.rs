//! `estatedesk domains`: what each record kind supports.

use estatedesk_core::{BatchPlan, DomainKind};
use strum::IntoEnumIterator;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, serde::Serialize)]
struct DomainInfo {
    domain: String,
    name: &'static str,
    form: Option<&'static str>,
    records: &'static str,
    actions: Vec<&'static str>,
    batch_delete: Option<String>,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Form")]
    form: String,
    #[tabled(rename = "Records")]
    records: String,
    #[tabled(rename = "Actions")]
    actions: String,
    #[tabled(rename = "Batch delete")]
    batch: String,
}

fn to_row(info: &DomainInfo) -> DomainRow {
    DomainRow {
        domain: info.domain.clone(),
        form: info.form.unwrap_or("-").to_owned(),
        records: info.records.to_owned(),
        actions: if info.actions.is_empty() {
            "-".to_owned()
        } else {
            info.actions.join(", ")
        },
        batch: info.batch_delete.clone().unwrap_or_else(|| "-".to_owned()),
    }
}

fn describe(kind: DomainKind) -> DomainInfo {
    DomainInfo {
        domain: kind.to_string(),
        name: kind.item_name(),
        form: kind.form_root(),
        records: kind.record_root(),
        actions: kind.transitions().iter().map(|a| a.name).collect(),
        batch_delete: kind.batch_plan().map(|plan| match plan {
            BatchPlan::Endpoint { url, .. } => url.to_owned(),
            BatchPlan::PerRecord { .. } => "per record".to_owned(),
        }),
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let infos: Vec<DomainInfo> = DomainKind::iter().map(describe).collect();
    let out = output::render_list(global.output, &infos, to_row, |i| i.domain.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
