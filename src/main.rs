use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use campaign_bridge_lib::config::BridgeConfig;
use campaign_bridge_lib::mapping::registration::{FieldSelection, RegistrationMap, UserField};
use campaign_bridge_lib::mapping::{FieldKind, FieldMap, FieldTarget, SyncType};
use campaign_bridge_lib::storage::{CredentialStore, FormRegistry, RegistrationStore};
use campaign_bridge_lib::sync::bulk::any_succeeded;
use campaign_bridge_lib::sync::default_list::DefaultAction;
use campaign_bridge_lib::sync::export::UserRecord;
use campaign_bridge_lib::sync::operations::{DealMode, DealTemplate, SUBSCRIBED, UNSUBSCRIBED};
use campaign_bridge_lib::Bridge;

#[derive(Parser)]
#[command(name = "campaign-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Map host form fields onto CRM contacts and keep them in sync")]
struct Cli {
    /// Directory holding config.json (defaults to the user config dir)
    #[arg(long, global = true, value_name = "path")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the CRM account URL and API key
    Keys { url: String, api_key: String },

    /// Register a host form so it can carry a mapping
    Form {
        form_key: String,
        #[arg(long, default_value = "")]
        label: String,
    },

    /// Attach a field mapping to a registered form
    Mapping {
        form_key: String,
        list_id: String,
        /// Remote action (contact_sync, contact_add)
        #[arg(long = "type", default_value = "contact_sync", value_parser = parse_sync_type)]
        sync_type: SyncType,
        /// local=remote or local=remote:Kind (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, FieldTarget)>,
    },

    /// Send one form submission through its mapping
    Sync {
        form_key: String,
        /// Submitted values as a JSON object
        #[arg(long, default_value = "{}")]
        values: String,
    },

    /// Show, enable or disable the default enrolment list
    DefaultList {
        list_id: Option<String>,
        #[arg(long)]
        disable: bool,
    },

    /// Subscribe contacts to a list
    Assign {
        list_id: String,
        contacts: Vec<String>,
        #[arg(long)]
        unsubscribe: bool,
    },

    /// Delete contacts by id
    DeleteContacts { ids: Vec<String> },

    /// Create a deal from a JSON template for the given contacts
    Deal {
        #[arg(long, value_name = "file")]
        template: PathBuf,
        /// 1: one deal per contact, 2: one shared deal
        #[arg(long, default_value_t = 1)]
        mode: i64,
        contacts: Vec<String>,
    },

    /// Save a registration mapping for contact export
    Registration {
        list_id: String,
        /// User field machine names that may be exported (repeatable)
        #[arg(long = "select")]
        selected: Vec<String>,
        /// remote=local assignments (repeatable)
        #[arg(long = "assign", value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
        /// Make this the active mapping
        #[arg(long)]
        activate: bool,
    },

    /// Export users (JSON array of records) through the active registration mapping
    Export {
        #[arg(long, value_name = "file")]
        users: PathBuf,
    },
}

fn parse_sync_type(s: &str) -> Result<SyncType, String> {
    SyncType::from_action(s).ok_or_else(|| format!("unknown sync type '{}'", s))
}

fn parse_field(s: &str) -> Result<(String, FieldTarget), String> {
    let (local, remote) = s
        .split_once('=')
        .ok_or_else(|| format!("expected local=remote, got '{}'", s))?;
    let (field, kind) = match remote.split_once(':') {
        Some((field, kind)) => (field, FieldKind::from(kind.to_string())),
        None => (remote, FieldKind::TextInput),
    };
    if local.trim().is_empty() || field.trim().is_empty() {
        return Err(format!("empty field name in '{}'", s));
    }
    Ok((
        local.trim().to_string(),
        FieldTarget {
            field: field.trim().to_string(),
            kind,
        },
    ))
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((remote, local)) if !remote.trim().is_empty() && !local.trim().is_empty() => {
            Ok((remote.trim().to_string(), local.trim().to_string()))
        }
        _ => Err(format!("expected remote=local, got '{}'", s)),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn report(ok: bool, action: &str, count: usize) {
    if ok {
        println!("{}: done ({} ids)", action, count);
    } else {
        println!("{}: failed ({} ids)", action, count);
    }
}

async fn run(bridge: &Bridge, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Keys { url, api_key } => {
            let saved = bridge.storage().save_credentials(&url, &api_key)?;
            report(saved, "save keys", 1);
        }
        Command::Form { form_key, label } => {
            let saved = bridge.storage().register_form(&form_key, &label)?;
            report(saved, "register form", 1);
        }
        Command::Mapping {
            form_key,
            list_id,
            sync_type,
            fields,
        } => {
            let count = fields.len();
            let field_map: FieldMap = fields.into_iter().collect();
            let saved = bridge
                .resolver()
                .save(&form_key, &list_id, sync_type, field_map)?;
            report(saved, "save mapping", count);
        }
        Command::Sync { form_key, values } => {
            let values: Map<String, Value> =
                serde_json::from_str(&values).context("values must be a JSON object")?;
            let outcome = bridge.sync_form(&form_key, &values).await;
            report(outcome.is_delivered(), "sync form", 1);
        }
        Command::DefaultList { list_id, disable } => {
            let policy = bridge.default_lists();
            match list_id {
                None => match policy.get_default()? {
                    Some(list_id) => println!("default list: {}", list_id),
                    None => println!("default list: none"),
                },
                Some(list_id) => {
                    let action = if disable {
                        DefaultAction::Disable
                    } else {
                        DefaultAction::Enable
                    };
                    let ok = policy.set_default(&list_id, action)?;
                    report(ok, "default list", 1);
                }
            }
        }
        Command::Assign {
            list_id,
            contacts,
            unsubscribe,
        } => {
            let status = if unsubscribe { UNSUBSCRIBED } else { SUBSCRIBED };
            let result = bridge.bulk()?.assign_list(&contacts, &list_id, status).await;
            report(result.any_succeeded(), "assign list", result.succeeded.len());
        }
        Command::DeleteContacts { ids } => {
            let result = bridge.bulk()?.delete_contacts(&ids).await;
            report(result.any_succeeded(), "delete contacts", result.succeeded.len());
        }
        Command::Deal {
            template,
            mode,
            contacts,
        } => {
            let mode = DealMode::from_code(mode).ok_or_else(|| anyhow!("mode must be 1 or 2"))?;
            let template: DealTemplate = match read_json(&template)? {
                Value::Object(fields) => fields,
                _ => bail!("deal template must be a JSON object"),
            };
            let result = bridge
                .bulk()?
                .create_deal(&contacts, &template, mode)
                .await;
            match &result {
                Err(e) if e.is_precondition() => log::warn!("deal rejected before sending: {}", e),
                Err(e) => log::error!("deal not created: {}", e),
                Ok(_) => {}
            }
            let count = result.as_ref().map(|r| r.attempted()).unwrap_or(0);
            report(any_succeeded(&result), "create deal", count);
        }
        Command::Registration {
            list_id,
            selected,
            assignments,
            activate,
        } => {
            let available: Vec<UserField> = selected
                .iter()
                .map(|name| UserField {
                    machine_name: name.clone(),
                    label: name.clone(),
                })
                .collect();
            let checked: Vec<&str> = selected.iter().map(String::as_str).collect();
            let selection = FieldSelection::new(&list_id, &available, &checked)?;
            let assignments: RegistrationMap = assignments.into_iter().collect();

            let mapping = bridge
                .storage()
                .save_registration_mapping(&selection.build_mapping(&assignments))?;
            if activate && !mapping.active {
                bridge.storage().set_registration_active(mapping.id, true)?;
            }
            println!("saved registration mapping {} ({} fields)", mapping.name, mapping.map.len());
        }
        Command::Export { users } => {
            let users: Vec<UserRecord> = serde_json::from_value(read_json(&users)?)
                .context("users must be a JSON array of objects")?;
            let exporter = bridge.exporter()?;
            let mapping = exporter.active_mapping()?;
            let mut exported = 0;
            for user in &users {
                match exporter.export_with(&mapping, user).await {
                    Ok(outcome) if outcome.accepted => exported += 1,
                    Ok(_) => log::warn!("user not exported"),
                    Err(e) => log::error!("user not exported: {}", e),
                }
            }
            report(exported > 0, "export users", exported);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => BridgeConfig::default_dir()?,
    };
    let config = BridgeConfig::load(&dir);
    let bridge = Bridge::open(config)?;

    run(&bridge, cli.command).await
}
