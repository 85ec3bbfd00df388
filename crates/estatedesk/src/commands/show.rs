//! `estatedesk show`: the read-only detail view of a record.

use estatedesk_core::{DetailSession, Engine};
use tabled::Tabled;

use crate::cli::{GlobalOpts, ShowArgs};
use crate::error::CliError;
use crate::host::Host;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn detail_table(session: &DetailSession) -> String {
    let rows: Vec<DetailRow> = session
        .rows()
        .iter()
        .map(|(field, value)| DetailRow {
            field: *field,
            value: value.clone(),
        })
        .collect();
    output::render_table(&rows)
}

pub async fn show(engine: &Engine, args: ShowArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    let mut host = Host::new(engine.page(), global);

    let spinner = host.spinner(format!("Loading {} #{}...", kind.item_name(), args.id));
    let session = engine.view(kind, &args.id).await;
    spinner.finish_and_clear();
    let Some(session) = session? else {
        let fallback = format!("{} #{} not found", kind.item_name(), args.id);
        return Err(CliError::Rejected {
            message: util::failure_message(&mut host, fallback),
        });
    };
    host.drain();

    let out = output::render_single(
        global.output,
        session.record(),
        |_| detail_table(&session),
        |record| record.id.clone().unwrap_or_else(|| args.id.clone()),
    )?;
    session.close();
    output::print_output(&out, global.quiet);
    Ok(())
}
