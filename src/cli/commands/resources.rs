//! Inventory commands: kinds, add, get, list, del, tag, set-service.

use std::path::PathBuf;
use std::process::ExitCode;

use comfy_table::{Cell, Color, Table};
use console::style;
use serde::Serialize;
use serde_json::json;

use super::{Session, resource_json};
use crate::codec::Codec;
use crate::io::Envelope;
use crate::resource::{Category, Kind, Resource};
use crate::store::{Entry, StoreError};

/// One resource as printed by `get` and `list --json`.
#[derive(Debug, Serialize)]
pub struct ResourceView {
    pub file: String,
    pub resource: serde_json::Value,
}

impl ResourceView {
    fn from_entry(codec: &Codec, entry: &Entry) -> anyhow::Result<Self> {
        Ok(Self {
            file: entry.file.display().to_string(),
            resource: resource_json(codec, &entry.resource)?,
        })
    }
}

pub fn run_kinds(session: &Session) -> anyhow::Result<ExitCode> {
    let kinds: Vec<_> = Kind::ALL
        .iter()
        .map(|kind| json!({ "kind": kind.as_str(), "category": category_name(kind.category()) }))
        .collect();
    let count = kinds.len();

    session.emit(Envelope::success(kinds).with_count(count), || {
        let mut table = Table::new();
        table.set_header(vec!["Kind", "Category"]);
        for kind in Kind::ALL {
            table.add_row(vec![kind.as_str(), category_name(kind.category())]);
        }
        println!("{table}");
    })
}

pub fn run_add(
    session: &Session,
    kind: Kind,
    name: String,
    into: Option<PathBuf>,
    tags: Vec<String>,
) -> anyhow::Result<ExitCode> {
    let file = session.target_file(into)?;
    let mut resource = Resource::new(kind, name.clone());
    resource.tags_mut().extend(tags);

    session.mutate(|store| store.add(resource, &file))?;

    let envelope = Envelope::success(json!({
        "name": name,
        "kind": kind.as_str(),
        "file": file.display().to_string(),
    }))
    .with_message(format!("Added {kind} '{name}'"));
    session.emit(envelope, || {
        println!(
            "{} {kind} '{name}' to {}",
            style("Added").green().bold(),
            file.display()
        );
    })
}

pub fn run_get(session: &Session, name: &str) -> anyhow::Result<ExitCode> {
    let store = session.open()?;
    let entry = store.get_entry(name);
    store.dispose();

    let Some(entry) = entry else {
        return Err(StoreError::NotFound {
            name: name.to_string(),
        }
        .into());
    };

    let view = ResourceView::from_entry(store.codec(), &entry)?;
    let yaml = serde_yaml::to_string(&store.codec().encode(&entry.resource)?)?;
    session.emit(Envelope::success(view).with_count(1), || {
        println!("# {}", entry.file.display());
        print!("{yaml}");
    })
}

pub fn run_list(session: &Session, kind: Option<Kind>) -> anyhow::Result<ExitCode> {
    let store = session.open()?;
    let entries: Vec<Entry> = store
        .entries()
        .into_iter()
        .filter(|e| kind.is_none_or(|k| e.resource.kind() == k))
        .collect();
    store.dispose();

    let views = entries
        .iter()
        .map(|entry| ResourceView::from_entry(store.codec(), entry))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let count = views.len();

    let envelope = Envelope::success(views)
        .with_count(count)
        .with_files(session.file_names());
    session.emit(envelope, || {
        if entries.is_empty() {
            println!("No resources found");
            return;
        }
        println!("{}", resource_table(&entries));
        println!("{count} resources");
    })
}

pub fn run_del(session: &Session, name: &str) -> anyhow::Result<ExitCode> {
    let removed = session.mutate(|store| store.delete(name))?;

    let envelope = Envelope::success(json!({ "name": removed.name(), "kind": removed.kind().as_str() }))
        .with_message(format!("Deleted '{}'", removed.name()));
    session.emit(envelope, || {
        println!(
            "{} {} '{}'",
            style("Deleted").red().bold(),
            removed.kind(),
            removed.name()
        );
    })
}

pub fn run_tag(session: &Session, name: &str, tag: &str) -> anyhow::Result<ExitCode> {
    let tags = session.mutate(|store| {
        store.modify(name, |resource| {
            resource.tags_mut().insert(tag.to_string());
            resource.tags().iter().cloned().collect::<Vec<_>>()
        })
    })?;

    session.emit(Envelope::success(json!({ "name": name, "tags": tags })), || {
        println!("{name}: {}", tags.join(", "));
    })
}

/// Network and host fields for `set-service`.
#[derive(Debug, Default, Clone)]
pub struct ServiceChanges {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub url: Option<String>,
    pub runs_on: Option<String>,
}

impl ServiceChanges {
    fn apply(self, resource: &mut Resource) -> bool {
        let Some(service) = resource.as_service_mut() else {
            return false;
        };
        if self.ip.is_some() || self.port.is_some() || self.protocol.is_some() || self.url.is_some()
        {
            let network = service.network_mut();
            if let Some(ip) = self.ip {
                network.ip = Some(ip);
            }
            if let Some(port) = self.port {
                network.port = Some(port);
            }
            if let Some(protocol) = self.protocol {
                network.protocol = Some(protocol);
            }
            if let Some(url) = self.url {
                network.url = Some(url);
            }
        }
        if let Some(host) = self.runs_on {
            service.runs_on = Some(host);
        }
        true
    }
}

pub fn run_set_service(
    session: &Session,
    name: &str,
    changes: ServiceChanges,
) -> anyhow::Result<ExitCode> {
    let applied = session.mutate(|store| {
        let mut resource = store
            .get_by_name(name)
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })?;
        if !changes.apply(&mut resource) {
            return Ok(None);
        }
        store.update(resource.clone())?;
        Ok(Some(resource))
    })?;

    let Some(resource) = applied else {
        anyhow::bail!("'{name}' is not a service");
    };

    let view = resource_json(&Codec::new(), &resource)?;
    session.emit(Envelope::success(view), || {
        println!("{} service '{}'", style("Updated").green().bold(), resource.name());
    })
}

fn category_name(category: Category) -> &'static str {
    match category {
        Category::Hardware => "hardware",
        Category::System => "system",
        Category::Service => "service",
    }
}

fn resource_table(entries: &[Entry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Kind", "Runs On", "Address", "Tags", "File"]);

    for entry in entries {
        let resource = &entry.resource;
        let (runs_on, address) = match resource {
            Resource::System(system) => (system.runs_on.clone(), None),
            Resource::Service(service) => (
                service.runs_on.clone(),
                service.network.as_ref().and_then(|n| match (&n.ip, n.port) {
                    (Some(ip), Some(port)) => Some(format!("{ip}:{port}")),
                    (Some(ip), None) => Some(ip.clone()),
                    (None, _) => n.url.clone(),
                }),
            ),
            _ => (None, None),
        };
        let kind_color = match resource.category() {
            Category::Hardware => Color::Cyan,
            Category::System => Color::Yellow,
            Category::Service => Color::Green,
        };

        table.add_row(vec![
            Cell::new(resource.name()),
            Cell::new(resource.kind()).fg(kind_color),
            Cell::new(runs_on.unwrap_or_default()),
            Cell::new(address.unwrap_or_default()),
            Cell::new(resource.tags().iter().cloned().collect::<Vec<_>>().join(", ")),
            Cell::new(entry.file.display()),
        ]);
    }
    table
}
